/// One queued message. The payload is immutable once built and the queue is its
/// only owner until a reader detaches it.
#[derive(Debug, PartialEq, Eq)]
pub struct Message {
    payload: Box<[u8]>,
}

impl Message {
    pub fn copy_from(bytes: &[u8]) -> Message {
        Message {
            payload: bytes.into(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload.into_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_is_detached_from_source() {
        let mut src = *b"hello";
        let msg = Message::copy_from(&src);
        src[0] = b'j';
        assert_eq!(msg.as_bytes(), b"hello");
        assert_eq!(msg.len(), 5);
        assert_eq!(msg.into_payload(), b"hello".to_vec());
    }
}
