/// A unit of work travelling down the chain.
///
/// End of input is its own variant, so no payload can ever be mistaken for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// A line of text to transform
    Data(String),
    /// No more input follows
    EndOfStream,
}

impl Record {
    /// Wrap a payload
    pub fn data(payload: impl Into<String>) -> Self {
        Record::Data(payload.into())
    }

    /// Check whether this record ends the stream
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Record::EndOfStream)
    }
}

impl From<String> for Record {
    fn from(payload: String) -> Self {
        Record::Data(payload)
    }
}

impl From<&str> for Record {
    fn from(payload: &str) -> Self {
        Record::Data(payload.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_marker_text_is_plain_data() {
        let record = Record::from("<END>");
        assert!(!record.is_end_of_stream());
        assert!(Record::EndOfStream.is_end_of_stream());
    }
}
