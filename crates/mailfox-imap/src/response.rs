//! Parsing of the server responses the client cares about.
//!
//! Only the handful of shapes produced by LOGIN, LIST, SELECT, SEARCH and
//! FETCH RFC822 are understood; everything else is kept as
//! [`Untagged::Other`] and ignored by the client.

use crate::{Error, Result};

/// Status of a tagged or untagged condition response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// OK.
    Ok,
    /// NO.
    No,
    /// BAD.
    Bad,
    /// PREAUTH (greeting only).
    PreAuth,
    /// BYE.
    Bye,
}

impl Status {
    fn parse(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "OK" => Some(Self::Ok),
            "NO" => Some(Self::No),
            "BAD" => Some(Self::Bad),
            "PREAUTH" => Some(Self::PreAuth),
            "BYE" => Some(Self::Bye),
            _ => None,
        }
    }
}

/// An entry from a LIST response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    /// Name attributes such as `\HasNoChildren`.
    pub attributes: Vec<String>,
    /// Hierarchy delimiter, if the server has one.
    pub delimiter: Option<String>,
    /// Mailbox name.
    pub name: String,
}

impl ListEntry {
    /// Returns true if the mailbox cannot be selected.
    #[must_use]
    pub fn is_noselect(&self) -> bool {
        self.attributes
            .iter()
            .any(|a| a.eq_ignore_ascii_case("\\Noselect") || a.eq_ignore_ascii_case("\\NonExistent"))
    }
}

/// Untagged (`*`) responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Untagged {
    /// `* OK|NO|BAD|PREAUTH|BYE text`.
    Condition {
        /// Condition status.
        status: Status,
        /// Human-readable text (including any response code).
        text: String,
    },
    /// `* n EXISTS`.
    Exists(u32),
    /// `* SEARCH n n n`.
    Search(Vec<String>),
    /// `* LIST (...) "/" name`.
    List(ListEntry),
    /// `* n FETCH (... RFC822 {len}...)`.
    Fetch {
        /// Message sequence number.
        id: String,
        /// Raw message bytes, if the RFC822 item was present and not NIL.
        rfc822: Option<Vec<u8>>,
    },
    /// Anything the client does not interpret.
    Other,
}

/// A single response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Completion of a command.
    Tagged {
        /// The command tag.
        tag: String,
        /// Completion status.
        status: Status,
        /// Human-readable text.
        text: String,
    },
    /// Server data.
    Untagged(Untagged),
    /// `+` continuation request.
    Continuation,
}

impl Response {
    /// Parses one response as returned by
    /// [`FramedStream::read_response`](crate::FramedStream::read_response).
    ///
    /// # Errors
    ///
    /// Returns an error for responses that are not tagged, untagged or
    /// continuation lines, or whose known shapes are malformed.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        if raw.starts_with(b"+") {
            return Ok(Self::Continuation);
        }

        let mut cursor = Cursor::new(raw);
        let tag = cursor.atom();
        cursor.space();

        if tag == "*" {
            return parse_untagged(&mut cursor).map(Self::Untagged);
        }
        if tag.is_empty() {
            return Err(cursor.error("expected tag"));
        }

        let status_word = cursor.atom();
        let status = Status::parse(&status_word)
            .ok_or_else(|| cursor.error(&format!("unknown status {status_word}")))?;
        cursor.space();

        Ok(Self::Tagged {
            tag,
            status,
            text: cursor.rest_of_line(),
        })
    }
}

fn parse_untagged(cursor: &mut Cursor<'_>) -> Result<Untagged> {
    let first = cursor.atom();
    cursor.space();

    if let Some(status) = Status::parse(&first) {
        return Ok(Untagged::Condition {
            status,
            text: cursor.rest_of_line(),
        });
    }

    if first.eq_ignore_ascii_case("SEARCH") {
        let ids = cursor
            .rest_of_line()
            .split_ascii_whitespace()
            .map(str::to_string)
            .collect();
        return Ok(Untagged::Search(ids));
    }

    if first.eq_ignore_ascii_case("LIST") {
        let attributes = cursor.paren_atoms()?;
        cursor.space();
        let delimiter = cursor.nstring()?;
        cursor.space();
        let name = cursor.astring()?;
        return Ok(Untagged::List(ListEntry {
            attributes,
            delimiter: delimiter.map(|d| String::from_utf8_lossy(&d).into_owned()),
            name: String::from_utf8_lossy(&name).into_owned(),
        }));
    }

    if first.bytes().all(|b| b.is_ascii_digit()) && !first.is_empty() {
        let keyword = cursor.atom();
        cursor.space();

        if keyword.eq_ignore_ascii_case("EXISTS") {
            let count = first
                .parse()
                .map_err(|_| cursor.error("EXISTS count out of range"))?;
            return Ok(Untagged::Exists(count));
        }

        if keyword.eq_ignore_ascii_case("FETCH") {
            return parse_fetch(cursor, first);
        }
    }

    Ok(Untagged::Other)
}

fn parse_fetch(cursor: &mut Cursor<'_>, id: String) -> Result<Untagged> {
    cursor.expect(b'(')?;
    let mut rfc822 = None;

    loop {
        cursor.space();
        if cursor.peek() == Some(b')') || cursor.peek().is_none() {
            break;
        }

        let name = cursor.fetch_item_name();
        cursor.space();

        if name.eq_ignore_ascii_case("RFC822") || name.eq_ignore_ascii_case("BODY[]") {
            rfc822 = cursor.nstring()?;
        } else {
            cursor.skip_value()?;
        }
    }

    Ok(Untagged::Fetch { id, rfc822 })
}

/// Byte cursor over a response.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn error(&self, message: &str) -> Error {
        Error::Protocol(format!("{message} at byte {}", self.pos))
    }

    fn expect(&mut self, b: u8) -> Result<()> {
        if self.peek() == Some(b) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected {:?}", char::from(b))))
        }
    }

    fn space(&mut self) {
        while self.peek() == Some(b' ') {
            self.pos += 1;
        }
    }

    fn take_while(&mut self, predicate: impl Fn(u8) -> bool) -> &'a [u8] {
        let start = self.pos;
        while self.peek().is_some_and(&predicate) {
            self.pos += 1;
        }
        &self.data[start..self.pos]
    }

    fn atom(&mut self) -> String {
        let bytes = self.take_while(|b| !matches!(b, b' ' | b'(' | b')' | b'\r' | b'\n' | b'{' | b'"'));
        String::from_utf8_lossy(bytes).into_owned()
    }

    /// A fetch item name such as `RFC822` or `BODY[HEADER.FIELDS (X)]`.
    fn fetch_item_name(&mut self) -> String {
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(b) = self.peek() {
            match b {
                b'[' => depth += 1,
                b']' => depth = depth.saturating_sub(1),
                b' ' | b')' | b'\r' | b'\n' if depth == 0 => break,
                _ => {}
            }
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.data[start..self.pos]).into_owned()
    }

    fn rest_of_line(&mut self) -> String {
        let bytes = self.take_while(|b| b != b'\r' && b != b'\n');
        String::from_utf8_lossy(bytes).trim().to_string()
    }

    /// `(atom atom ...)`.
    fn paren_atoms(&mut self) -> Result<Vec<String>> {
        self.expect(b'(')?;
        let mut atoms = Vec::new();
        loop {
            self.space();
            match self.peek() {
                Some(b')') => {
                    self.pos += 1;
                    return Ok(atoms);
                }
                Some(_) => {
                    let atom = self.atom();
                    if atom.is_empty() {
                        return Err(self.error("unexpected byte in list"));
                    }
                    atoms.push(atom);
                }
                None => return Err(self.error("unterminated list")),
            }
        }
    }

    /// Quoted string, literal, or `NIL`.
    fn nstring(&mut self) -> Result<Option<Vec<u8>>> {
        match self.peek() {
            Some(b'"') => self.quoted().map(Some),
            Some(b'{') => self.literal().map(Some),
            _ => {
                let atom = self.atom();
                if atom.eq_ignore_ascii_case("NIL") {
                    Ok(None)
                } else {
                    Err(self.error("expected string or NIL"))
                }
            }
        }
    }

    /// Quoted string, literal, or atom.
    fn astring(&mut self) -> Result<Vec<u8>> {
        match self.peek() {
            Some(b'"') => self.quoted(),
            Some(b'{') => self.literal(),
            _ => {
                let start = self.pos;
                let bytes = self.take_while(|b| !matches!(b, b' ' | b'\r' | b'\n'));
                if bytes.is_empty() {
                    return Err(Error::Protocol(format!("expected astring at byte {start}")));
                }
                Ok(bytes.to_vec())
            }
        }
    }

    fn quoted(&mut self) -> Result<Vec<u8>> {
        self.expect(b'"')?;
        let mut out = Vec::new();
        while let Some(b) = self.peek() {
            self.pos += 1;
            match b {
                b'"' => return Ok(out),
                b'\\' => {
                    if let Some(escaped) = self.peek() {
                        out.push(escaped);
                        self.pos += 1;
                    }
                }
                _ => out.push(b),
            }
        }
        Err(self.error("unterminated quoted string"))
    }

    /// `{n}\r\n` followed by `n` bytes.
    fn literal(&mut self) -> Result<Vec<u8>> {
        self.expect(b'{')?;
        let digits = self.take_while(|b| b.is_ascii_digit());
        let len: usize = std::str::from_utf8(digits)
            .ok()
            .and_then(|d| d.parse().ok())
            .ok_or_else(|| self.error("bad literal length"))?;
        if self.peek() == Some(b'+') {
            self.pos += 1;
        }
        self.expect(b'}')?;
        self.expect(b'\r')?;
        self.expect(b'\n')?;

        let end = self.pos + len;
        let bytes = self
            .data
            .get(self.pos..end)
            .ok_or_else(|| self.error("literal shorter than announced"))?;
        self.pos = end;
        Ok(bytes.to_vec())
    }

    /// Skips one value: string, literal, parenthesized list or atom.
    fn skip_value(&mut self) -> Result<()> {
        match self.peek() {
            Some(b'"') => self.quoted().map(drop),
            Some(b'{') => self.literal().map(drop),
            Some(b'(') => {
                self.pos += 1;
                loop {
                    self.space();
                    match self.peek() {
                        Some(b')') => {
                            self.pos += 1;
                            return Ok(());
                        }
                        Some(_) => self.skip_value()?,
                        None => return Err(self.error("unterminated list")),
                    }
                }
            }
            Some(_) => {
                let atom = self.fetch_item_name();
                if atom.is_empty() {
                    Err(self.error("unexpected byte"))
                } else {
                    Ok(())
                }
            }
            None => Err(self.error("unexpected end of response")),
        }
    }
}
