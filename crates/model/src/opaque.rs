use std::any::Any;
use std::fmt::{self, Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A provider-specific history message carried through the agent
/// untouched.
///
/// Some providers need the exact assistant message they produced (for
/// example one that contains tool calls) to be replayed in the next
/// request. The provider wraps that message in an `OpaqueMessage`, the
/// agent stores it in the conversation, and the provider unwraps it
/// again when serializing the next request.
///
/// Two opaque messages are equal when their ids are equal.
#[derive(Clone)]
pub struct OpaqueMessage {
    id: Arc<str>,
    value: Arc<dyn Any + Send + Sync>,
}

impl OpaqueMessage {
    /// Wraps `value` under the given id. The id should be unique within
    /// a conversation.
    #[inline]
    pub fn new<ID, T>(id: ID, value: T) -> Self
    where
        ID: Into<String>,
        T: Send + Sync + 'static,
    {
        Self {
            id: Arc::from(id.into()),
            value: Arc::new(value),
        }
    }

    /// Returns the id of this message.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the wrapped value if it has type `T`.
    #[inline]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref()
    }
}

impl Debug for OpaqueMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OpaqueMessage").field(&self.id).finish()
    }
}

impl PartialEq for OpaqueMessage {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for OpaqueMessage {}

impl Hash for OpaqueMessage {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    struct ProviderMessage {
        text: String,
    }

    #[test]
    fn test_downcast() {
        let opaque = OpaqueMessage::new(
            "chatcmpl-1",
            ProviderMessage {
                text: "Hello".to_owned(),
            },
        );
        assert_eq!(opaque.id(), "chatcmpl-1");
        let raw = opaque.downcast_ref::<ProviderMessage>().unwrap();
        assert_eq!(raw.text, "Hello");
        assert!(opaque.downcast_ref::<String>().is_none());
    }

    #[test]
    fn test_identity_by_id() {
        let first = OpaqueMessage::new("msg:0", "Hello".to_owned());
        let same_id = OpaqueMessage::new("msg:0", "Bye".to_owned());
        let other = OpaqueMessage::new("msg:1", "Hello".to_owned());
        assert_eq!(first, same_id);
        assert_ne!(first, other);

        let set: HashSet<_> = [first.clone(), same_id, other].into();
        assert_eq!(set.len(), 2);
        assert_eq!(format!("{first:?}"), "OpaqueMessage(\"msg:0\")");
    }
}
