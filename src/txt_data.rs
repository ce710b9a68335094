use std::io::prelude::*;
use std::ops::Index;
use std::path::Path;

use custom_error::custom_error;

use crate::error::Result;

custom_error! {pub TokenError
    UnknownEscape{escaped: char} = "unknown escape sequence before '{escaped}'",
    DanglingEscape = "line ends with an escape character",
}

#[derive(Debug)]
pub struct DataFile {
    buf: String,
}

impl DataFile {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<DataFile> {
        let mut file = std::fs::File::open(path)?;
        DataFile::from_reader(&mut file)
    }

    pub fn from_reader<B: Read>(reader: &mut B) -> Result<DataFile> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(DataFile {
            buf: String::from_utf8_lossy(&buf).into_owned(),
        })
    }

    pub fn lines(&self) -> LineIter<'_> {
        LineIter {
            lines: self.buf.split('\n'),
            number: 0,
        }
    }
}

impl From<String> for DataFile {
    fn from(buf: String) -> Self {
        DataFile { buf }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Line<'a> {
    pub number: usize,
    pub text: &'a str,
    pub crlf: bool,
}

pub struct LineIter<'a> {
    lines: std::str::Split<'a, char>,
    number: usize,
}

impl<'a> Iterator for LineIter<'a> {
    type Item = Line<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let raw = self.lines.next()?;
        self.number += 1;
        let (text, crlf) = match raw.strip_suffix('\r') {
            Some(text) => (text, true),
            None => (raw, false),
        };
        Some(Line {
            number: self.number,
            text,
            crlf,
        })
    }
}

#[derive(Debug, PartialEq)]
pub struct Record {
    fields: Vec<String>,
}

impl Record {
    /// Splits a line on commas. Double quotes group text containing commas
    /// and are removed, a backslash escapes `"`, `\`, `,` or stands for a
    /// newline as `\n`.
    pub fn tokenize(line: &str) -> std::result::Result<Record, TokenError> {
        let mut fields = Vec::new();
        let mut field = String::new();
        let mut quoted = false;
        let mut chars = line.chars();

        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some('n') => field.push('\n'),
                    Some(e @ ('"' | '\\' | ',')) => field.push(e),
                    Some(escaped) => return Err(TokenError::UnknownEscape { escaped }),
                    None => return Err(TokenError::DanglingEscape),
                },
                '"' => quoted = !quoted,
                ',' if !quoted => fields.push(std::mem::take(&mut field)),
                c => field.push(c),
            }
        }
        fields.push(field);

        Ok(Record { fields })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Index<usize> for Record {
    type Output = str;

    fn index(&self, i: usize) -> &Self::Output {
        &self.fields[i]
    }
}

pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\r' => (),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_commas_stay_in_field() {
        let r = Record::tokenize(r#""Lake, North",LKN,,"a \"b\"""#).unwrap();
        assert_eq!(r.len(), 4);
        assert_eq!(&r[0], "Lake, North");
        assert_eq!(&r[1], "LKN");
        assert_eq!(&r[2], "");
        assert_eq!(&r[3], r#"a "b""#);
    }

    #[test]
    fn trailing_comma_is_an_empty_field() {
        let r = Record::tokenize("a,b,").unwrap();
        assert_eq!(r.len(), 3);
        assert_eq!(&r[2], "");
    }

    #[test]
    fn bad_escapes() {
        assert!(matches!(
            Record::tokenize(r"a\qb"),
            Err(TokenError::UnknownEscape { escaped: 'q' })
        ));
        assert!(matches!(
            Record::tokenize("a\\"),
            Err(TokenError::DanglingEscape)
        ));
    }

    #[test]
    fn quote_round_trip() {
        let text = "say \"hi\"\nback\\slash, comma";
        let r = Record::tokenize(&format!("x,{}", quote(text))).unwrap();
        assert_eq!(&r[1], text);
    }

    #[test]
    fn lines_know_their_terminator() {
        let file = DataFile::from("one\r\ntwo\nthree".to_string());
        let lines: Vec<_> = file.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].crlf);
        assert_eq!(lines[0].text, "one");
        assert!(!lines[1].crlf);
        assert_eq!(lines[2].number, 3);
    }
}
