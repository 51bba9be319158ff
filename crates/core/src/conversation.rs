//! Conversation-related types.

use research_agent_model::ModelMessage;

/// The history of completed agent runs.
#[derive(Clone, Default, Debug)]
pub struct Conversation {
    runs: Vec<Run>,
}

/// One completed agent run: the user input, the final answer, and every
/// message exchanged with the model in between.
#[derive(Clone, Debug)]
pub struct Run {
    input: String,
    output: String,
    messages: Vec<ModelMessage>,
}

impl Run {
    pub(crate) fn new(
        input: String,
        output: String,
        messages: Vec<ModelMessage>,
    ) -> Self {
        Self {
            input,
            output,
            messages,
        }
    }

    /// Returns the user input that started this run.
    #[inline]
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Returns the final answer of this run.
    #[inline]
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Returns the messages of this run, including tool calls and their
    /// results.
    #[inline]
    pub fn messages(&self) -> &[ModelMessage] {
        &self.messages
    }
}

impl Conversation {
    /// Returns all runs, oldest first.
    #[inline]
    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    /// Returns the number of completed runs.
    #[inline]
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Returns `true` if no run has completed yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub(crate) fn push(&mut self, run: Run) {
        self.runs.push(run);
    }

    pub(crate) fn clear(&mut self) {
        self.runs.clear();
    }

    /// Returns the messages of the last `num_runs` runs, oldest first.
    pub fn recent_messages(&self, num_runs: usize) -> Vec<ModelMessage> {
        let skip = self.runs.len().saturating_sub(num_runs);
        self.runs[skip..]
            .iter()
            .flat_map(|run| run.messages.iter().cloned())
            .collect()
    }

    /// Renders the inputs and answers of every run as plain text.
    ///
    /// Tool traffic is left out, the transcript is meant for humans and
    /// for the session summarizer.
    pub fn transcript(&self) -> String {
        let mut transcript = String::new();
        for run in &self.runs {
            if !transcript.is_empty() {
                transcript.push('\n');
            }
            transcript.push_str("User: ");
            transcript.push_str(&run.input);
            transcript.push_str("\nAssistant: ");
            transcript.push_str(&run.output);
            transcript.push('\n');
        }
        transcript
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(n: usize) -> Run {
        Run::new(
            format!("question {n}"),
            format!("answer {n}"),
            vec![
                ModelMessage::User(format!("question {n}")),
                ModelMessage::Assistant(format!("answer {n}")),
            ],
        )
    }

    #[test]
    fn test_recent_messages() {
        let mut conversation = Conversation::default();
        assert!(conversation.recent_messages(3).is_empty());

        for n in 0..5 {
            conversation.push(run(n));
        }
        let recent = conversation.recent_messages(3);
        assert_eq!(recent.len(), 6);
        assert_eq!(recent[0], ModelMessage::User("question 2".to_owned()));
        assert_eq!(recent[5], ModelMessage::Assistant("answer 4".to_owned()));

        assert_eq!(conversation.recent_messages(10).len(), 10);
        assert!(conversation.recent_messages(0).is_empty());
    }

    #[test]
    fn test_transcript() {
        let mut conversation = Conversation::default();
        conversation.push(run(1));
        conversation.push(run(2));
        assert_eq!(
            conversation.transcript(),
            "User: question 1\nAssistant: answer 1\n\n\
             User: question 2\nAssistant: answer 2\n"
        );

        conversation.clear();
        assert!(conversation.is_empty());
        assert_eq!(conversation.transcript(), "");
    }
}
