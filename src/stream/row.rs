//! Row decoding
//!
//! A row is a Vector or List whose elements all widen to `f64`.

use std::io::Read;

use crate::error::{Result, TypedBytesError};
use crate::protocol::{TypeTag, TypedBytesReader};

/// Upper bound on elements reserved from a Vector header before any are read
const ROW_RESERVE_LIMIT: usize = 4096;

/// Decodes consecutive rows and keeps the row index for diagnostics
#[derive(Debug, Default)]
pub struct RowDecoder {
    rows_read: usize,
}

impl RowDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows fully decoded so far
    #[inline(always)]
    pub fn rows_read(&self) -> usize {
        self.rows_read
    }

    /// Decode one row into `row`, replacing its contents.
    pub fn read_full_row<R: Read>(
        &mut self,
        reader: &mut TypedBytesReader<R>,
        row: &mut Vec<f64>,
    ) -> Result<()> {
        row.clear();
        match reader.next_tag()? {
            TypeTag::Vector => {
                let len = reader.read_sequence_length()?;
                row.reserve(len.min(ROW_RESERVE_LIMIT));
                for _ in 0..len {
                    let tag = reader.next_tag()?;
                    self.push_element(reader, tag, row)?;
                }
            }
            TypeTag::List => loop {
                let tag = reader.next_tag()?;
                if tag == TypeTag::ListEnd {
                    break;
                }
                self.push_element(reader, tag, row)?;
            },
            _ if reader.at_eof() => {
                return Err(TypedBytesError::UnexpectedEof { context: "row" });
            }
            tag => {
                return Err(TypedBytesError::NotARow {
                    row: self.rows_read,
                    tag,
                });
            }
        }
        self.rows_read += 1;
        Ok(())
    }

    fn push_element<R: Read>(
        &self,
        reader: &mut TypedBytesReader<R>,
        tag: TypeTag,
        row: &mut Vec<f64>,
    ) -> Result<()> {
        if reader.at_eof() {
            return Err(TypedBytesError::UnexpectedEof {
                context: "row element",
            });
        }
        if !reader.can_be_double(tag) {
            return Err(TypedBytesError::NonNumericElement {
                row: self.rows_read,
                col: row.len(),
                tag,
            });
        }
        row.push(reader.convert_double()?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::TypedBytesWriter;
    use std::io::Cursor;

    fn reader_for(f: impl FnOnce(&mut TypedBytesWriter<Vec<u8>>)) -> TypedBytesReader<Cursor<Vec<u8>>> {
        let mut w = TypedBytesWriter::new(Vec::new());
        f(&mut w);
        TypedBytesReader::new(Cursor::new(w.into_inner()))
    }

    #[test]
    fn test_vector_and_list_rows() {
        let mut r = reader_for(|w| {
            w.write_vector_start(3).unwrap();
            w.write_int(1).unwrap();
            w.write_float(2.5).unwrap();
            w.write_bool(true).unwrap();
            w.write_list_start().unwrap();
            w.write_long(-4).unwrap();
            w.write_byte(5).unwrap();
            w.write_list_end().unwrap();
        });
        let mut decoder = RowDecoder::new();
        let mut row = Vec::new();

        decoder.read_full_row(&mut r, &mut row).unwrap();
        assert_eq!(row, vec![1.0, 2.5, 1.0]);
        decoder.read_full_row(&mut r, &mut row).unwrap();
        assert_eq!(row, vec![-4.0, 5.0]);
        assert_eq!(decoder.rows_read(), 2);
    }

    #[test]
    fn test_empty_list_row() {
        let mut r = reader_for(|w| {
            w.write_list_start().unwrap();
            w.write_list_end().unwrap();
        });
        let mut row = vec![9.0];
        RowDecoder::new().read_full_row(&mut r, &mut row).unwrap();
        assert!(row.is_empty());
    }

    #[test]
    fn test_string_element_names_row_and_column() {
        let mut r = reader_for(|w| {
            w.write_vector_start(2).unwrap();
            w.write_double(1.0).unwrap();
            w.write_double(2.0).unwrap();
            w.write_vector_start(2).unwrap();
            w.write_double(3.0).unwrap();
            w.write_string(b"four").unwrap();
        });
        let mut decoder = RowDecoder::new();
        let mut row = Vec::new();
        decoder.read_full_row(&mut r, &mut row).unwrap();

        let err = decoder.read_full_row(&mut r, &mut row).unwrap_err();
        assert!(matches!(
            err,
            TypedBytesError::NonNumericElement {
                row: 1,
                col: 1,
                tag: TypeTag::String
            }
        ));
        assert!(err.to_string().contains("row 1, col 1"));
    }

    #[test]
    fn test_non_sequence_row_rejected() {
        let mut r = reader_for(|w| w.write_double(1.0).unwrap());
        assert!(matches!(
            RowDecoder::new().read_full_row(&mut r, &mut Vec::new()),
            Err(TypedBytesError::NotARow {
                row: 0,
                tag: TypeTag::Double
            })
        ));
    }

    #[test]
    fn test_truncated_list_row() {
        let mut r = reader_for(|w| {
            w.write_list_start().unwrap();
            w.write_double(1.0).unwrap();
        });
        assert!(matches!(
            RowDecoder::new().read_full_row(&mut r, &mut Vec::new()),
            Err(TypedBytesError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_oversized_vector_header_then_eof() {
        let mut r = TypedBytesReader::new(Cursor::new(vec![8, 0x7f, 0xff, 0xff, 0xff]));
        let mut row = Vec::new();
        assert!(matches!(
            RowDecoder::new().read_full_row(&mut r, &mut row),
            Err(TypedBytesError::UnexpectedEof { .. })
        ));
        assert!(row.capacity() <= ROW_RESERVE_LIMIT);
    }
}
