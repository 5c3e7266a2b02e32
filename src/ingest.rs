use std::io::BufRead;

use crate::error::{DecodeError, IngestError};
use crate::fill::{decode_line, Fill};

/// Lazily decodes a newline-delimited JSON fill log.
///
/// Each item is either a decoded fill or the reason its line was rejected.
/// Decode failures are per line, including lines that are not UTF-8, and the
/// iterator keeps going after them; an [`IngestError::Io`] means the
/// underlying reader failed. Blank lines are skipped without producing an item.
pub struct FillReader<R> {
    reader: R,
    buf: Vec<u8>,
    line_no: usize,
}

impl<R: BufRead> FillReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line_no: 0,
        }
    }

    /// 1-based number of the last line read.
    pub fn line_no(&self) -> usize {
        self.line_no
    }
}

impl<R: BufRead> Iterator for FillReader<R> {
    type Item = Result<Fill, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(err) => return Some(Err(IngestError::Io(err))),
            }
            self.line_no += 1;
            let line = self.line_no;

            let decoded = match std::str::from_utf8(&self.buf) {
                Ok(text) if text.trim().is_empty() => continue,
                Ok(text) => decode_line(text),
                Err(err) => Err(DecodeError::from(err)),
            };
            return Some(decoded.map_err(|source| IngestError::Decode { line, source }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fill::Side;
    use std::io::Cursor;

    #[test]
    fn yields_fills_and_line_numbered_errors() {
        let input = concat!(
            "{\"side\":\"Buy\",\"qty\":\"1\",\"price\":\"100\",\"cost\":\"0\"}\n",
            "not json\n",
            "\n",
            "{\"side\":\"Sell\",\"qty\":\"1\",\"price\":\"110\"}\n",
            "{\"side\":\"Sell\",\"qty\":\"1\",\"price\":\"110\",\"cost\":\"0\"}",
        );
        let items: Vec<_> = FillReader::new(Cursor::new(input)).collect();
        assert_eq!(items.len(), 4);

        assert_eq!(items[0].as_ref().unwrap().side, Side::Buy);
        match &items[1] {
            Err(IngestError::Decode { line, source }) => {
                assert_eq!(*line, 2);
                assert!(matches!(source, DecodeError::Json(_)));
            }
            other => panic!("expected decode error, got {other:?}"),
        }
        match &items[2] {
            Err(IngestError::Decode { line, source }) => {
                assert_eq!(*line, 4);
                assert!(matches!(source, DecodeError::MissingField("cost")));
            }
            other => panic!("expected decode error, got {other:?}"),
        }
        assert_eq!(items[3].as_ref().unwrap().side, Side::Sell);
    }

    #[test]
    fn empty_input_yields_nothing() {
        let mut reader = FillReader::new(Cursor::new(""));
        assert!(reader.next().is_none());
        assert_eq!(reader.line_no(), 0);
    }

    #[test]
    fn invalid_utf8_line_is_a_decode_error_and_reading_continues() {
        let mut bytes = b"{\"side\":\"Buy\",\"qty\":1,\"price\":100,\"cost\":0}\n".to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe, b'\n']);
        bytes.extend_from_slice(b"{\"side\":\"Sell\",\"qty\":1,\"price\":110,\"cost\":0}\r\n");
        let items: Vec<_> = FillReader::new(Cursor::new(bytes)).collect();
        assert_eq!(items.len(), 3);

        assert_eq!(items[0].as_ref().unwrap().side, Side::Buy);
        match &items[1] {
            Err(IngestError::Decode { line, source }) => {
                assert_eq!(*line, 2);
                assert!(matches!(source, DecodeError::Utf8(_)));
            }
            other => panic!("expected decode error, got {other:?}"),
        }
        assert_eq!(items[2].as_ref().unwrap().side, Side::Sell);
    }

    #[test]
    fn read_failure_is_an_io_error() {
        struct Broken;

        impl std::io::Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "disk gone"))
            }
        }

        let mut reader = FillReader::new(std::io::BufReader::new(Broken));
        assert!(matches!(reader.next(), Some(Err(IngestError::Io(_)))));
    }
}
