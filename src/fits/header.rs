//! FITS header cards: 80-column keyword records in 2880-byte blocks.

use crate::error::StorageError;

/// Length of one header card.
pub const CARD_LEN: usize = 80;

/// FITS logical record length; header and data are padded to multiples of it.
pub const BLOCK_LEN: usize = 2880;

/// Longest string value that fits between the quotes of a card.
pub const MAX_TEXT_LEN: usize = CARD_LEN - 12;

/// Value field of a keyword card.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Logical(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Fixed-format rendering: strings left-justified in quotes starting at
    /// column 11, everything else right-justified to column 30.
    fn render(&self) -> String {
        match self {
            Value::Logical(b) => format!("{:>20}", if *b { "T" } else { "F" }),
            Value::Integer(i) => format!("{:>20}", i),
            Value::Float(f) => format!("{:>20}", render_float(*f)),
            Value::Text(s) => format!("'{:<8}'", escape_text(s)),
        }
    }
}

/// Quote-doubled, printable-ASCII form of `s`, cut so the closing quote
/// still lands inside the card. A doubled quote is never split.
fn escape_text(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len().min(MAX_TEXT_LEN));
    for c in s.chars() {
        let c = if c.is_ascii() && !c.is_ascii_control() { c } else { '?' };
        let width = if c == '\'' { 2 } else { 1 };
        if escaped.len() + width > MAX_TEXT_LEN {
            log::warn!("String value truncated to {} characters: {}", MAX_TEXT_LEN, s);
            break;
        }
        if c == '\'' {
            escaped.push('\'');
        }
        escaped.push(c);
    }
    escaped
}

fn render_float(value: f64) -> String {
    let s = format!("{:?}", value).replace('e', "E");
    if s.contains('.') || s.contains('E') || !value.is_finite() {
        s
    } else {
        format!("{}.0", s)
    }
}

/// One header record.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub keyword: String,
    pub value: Option<Value>,
    pub comment: Option<String>,
}

impl Card {
    pub fn new(keyword: &str, value: Value, comment: &str) -> Self {
        Self {
            keyword: keyword.to_uppercase(),
            value: Some(value),
            comment: (!comment.is_empty()).then(|| comment.to_string()),
        }
    }

    pub fn end() -> Self {
        Self {
            keyword: "END".to_string(),
            value: None,
            comment: None,
        }
    }

    pub fn is_end(&self) -> bool {
        self.keyword == "END"
    }

    /// Render the card to exactly 80 ASCII bytes.
    pub fn to_bytes(&self) -> [u8; CARD_LEN] {
        let mut text = format!("{:<8}", self.keyword);
        if let Some(value) = &self.value {
            text.push_str("= ");
            text.push_str(&value.render());
        }
        if let Some(comment) = &self.comment {
            text.push_str(" / ");
            text.push_str(comment);
        }

        let mut card = [b' '; CARD_LEN];
        for (dst, src) in card.iter_mut().zip(text.bytes()) {
            *dst = if src.is_ascii() && !src.is_ascii_control() {
                src
            } else {
                b'?'
            };
        }
        card
    }

    /// Parse one 80-byte record.
    pub fn parse(raw: &[u8]) -> Result<Self, StorageError> {
        if raw.len() != CARD_LEN {
            return Err(StorageError::Format(format!(
                "header card is {} bytes, expected {}",
                raw.len(),
                CARD_LEN
            )));
        }
        if !raw.is_ascii() {
            return Err(StorageError::Format("header card is not ASCII".to_string()));
        }
        let text = std::str::from_utf8(raw)
            .map_err(|_| StorageError::Format("header card is not ASCII".to_string()))?;

        let keyword = text[..8].trim_end().to_string();
        if &text[8..10] != "= " {
            return Ok(Self {
                keyword,
                value: None,
                comment: None,
            });
        }

        let field = &text[10..];
        let (value, rest) = if let Some(quoted) = field.trim_start().strip_prefix('\'') {
            parse_text(quoted)?
        } else {
            match field.find('/') {
                Some(slash) => (parse_scalar(field[..slash].trim())?, &field[slash..]),
                None => (parse_scalar(field.trim())?, ""),
            }
        };

        let comment = rest
            .trim_start()
            .strip_prefix('/')
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        Ok(Self {
            keyword,
            value: Some(value),
            comment,
        })
    }
}

/// Parse a quoted string body (after the opening quote); returns the value
/// and the remainder of the card after the closing quote.
fn parse_text(body: &str) -> Result<(Value, &str), StorageError> {
    let bytes = body.as_bytes();
    let mut out = String::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\'' {
            if bytes.get(i + 1) == Some(&b'\'') {
                out.push('\'');
                i += 2;
                continue;
            }
            let text = out.trim_end().to_string();
            return Ok((Value::Text(text), &body[i + 1..]));
        }
        out.push(bytes[i] as char);
        i += 1;
    }
    Err(StorageError::Format("unterminated string value".to_string()))
}

fn parse_scalar(token: &str) -> Result<Value, StorageError> {
    match token {
        "T" => return Ok(Value::Logical(true)),
        "F" => return Ok(Value::Logical(false)),
        _ => {}
    }
    if let Ok(i) = token.parse::<i64>() {
        return Ok(Value::Integer(i));
    }
    token
        .replace('D', "E")
        .parse::<f64>()
        .map(Value::Float)
        .map_err(|_| StorageError::Format(format!("unparsable value '{}'", token)))
}

/// Ordered list of header cards (END excluded).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    cards: Vec<Card>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, card: Card) {
        self.cards.push(card);
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn get(&self, keyword: &str) -> Option<&Value> {
        self.cards
            .iter()
            .find(|c| c.keyword == keyword)
            .and_then(|c| c.value.as_ref())
    }

    /// Replace the value of an existing card, keeping its position and comment.
    pub fn set(&mut self, keyword: &str, value: Value) -> bool {
        match self.cards.iter_mut().find(|c| c.keyword == keyword) {
            Some(card) => {
                card.value = Some(value);
                true
            }
            None => false,
        }
    }

    pub fn get_int(&self, keyword: &str) -> Option<i64> {
        match self.get(keyword)? {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Float lookup; integer-valued cards are accepted too.
    pub fn get_float(&self, keyword: &str) -> Option<f64> {
        match self.get(keyword)? {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn get_str(&self, keyword: &str) -> Option<&str> {
        match self.get(keyword)? {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn get_bool(&self, keyword: &str) -> Option<bool> {
        match self.get(keyword)? {
            Value::Logical(b) => Some(*b),
            _ => None,
        }
    }

    /// Serialize the cards plus END, space-padded to a whole number of blocks.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(BLOCK_LEN);
        for card in self.cards.iter().chain(std::iter::once(&Card::end())) {
            bytes.extend_from_slice(&card.to_bytes());
        }
        let padded = bytes.len().div_ceil(BLOCK_LEN) * BLOCK_LEN;
        bytes.resize(padded, b' ');
        bytes
    }

    /// Parse header blocks from the start of `bytes`; returns the header and
    /// the number of bytes it occupies (a multiple of the block length).
    pub fn parse(bytes: &[u8]) -> Result<(Self, usize), StorageError> {
        let mut header = Header::new();
        for (index, raw) in bytes.chunks_exact(CARD_LEN).enumerate() {
            let card = Card::parse(raw)?;
            if card.is_end() {
                let used = (index + 1) * CARD_LEN;
                return Ok((header, used.div_ceil(BLOCK_LEN) * BLOCK_LEN));
            }
            if !card.keyword.is_empty() {
                header.push(card);
            }
        }
        Err(StorageError::Format("missing END card".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card_text(card: &Card) -> String {
        String::from_utf8(card.to_bytes().to_vec()).unwrap()
    }

    #[test]
    fn test_integer_card_layout() {
        let text = card_text(&Card::new("NAXIS", Value::Integer(2), "number of array dimensions"));
        assert_eq!(text.len(), 80);
        assert_eq!(&text[..10], "NAXIS   = ");
        // Value right-justified to column 30
        assert_eq!(&text[29..30], "2");
        assert_eq!(&text[30..33], " / ");
    }

    #[test]
    fn test_string_card_layout() {
        let text = card_text(&Card::new("IMTYPE", Value::Text("bias".into()), "exposure type"));
        assert_eq!(&text[10..20], "'bias    '");
    }

    #[test]
    fn test_logical_card() {
        let text = card_text(&Card::new("SIMPLE", Value::Logical(true), ""));
        assert_eq!(&text[29..30], "T");
        assert!(text[30..].trim().is_empty());
    }

    #[test]
    fn test_float_rendering() {
        assert_eq!(render_float(10.0), "10.0");
        assert_eq!(render_float(2.5), "2.5");
        assert_eq!(render_float(1e-7), "1E-7");
    }

    #[test]
    fn test_parse_cards() {
        let card = Card::new("GAIN", Value::Float(12.5), "gain in db");
        assert_eq!(Card::parse(&card.to_bytes()).unwrap(), card);

        let card = Card::new("INSTRUME", Value::Text("it's a cam".into()), "instrument");
        assert_eq!(Card::parse(&card.to_bytes()).unwrap(), card);

        let card = Card::new("NFRAME", Value::Integer(-3), "number of frames");
        assert_eq!(Card::parse(&card.to_bytes()).unwrap(), card);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let mut raw = [b' '; CARD_LEN];
        raw[..10].copy_from_slice(b"EXPTIME = ");
        raw[10..15].copy_from_slice(b"xyzzy");
        assert!(Card::parse(&raw).is_err());
    }

    #[test]
    fn test_long_string_truncated_inside_quotes() {
        let long = "X".repeat(70);
        let card = Card::new("INSTRUME", Value::Text(long), "instrument used to acquire image");
        let text = card_text(&card);
        assert_eq!(&text[10..11], "'");
        assert_eq!(&text[79..80], "'");

        let parsed = Card::parse(&card.to_bytes()).unwrap();
        assert_eq!(parsed.value, Some(Value::Text("X".repeat(MAX_TEXT_LEN))));
    }

    #[test]
    fn test_truncation_keeps_doubled_quote_whole() {
        // 67 characters then a quote: the doubled quote would overrun by one
        let value = format!("{}'tail", "a".repeat(67));
        let parsed = Card::parse(&Card::new("OBJECT", Value::Text(value), "").to_bytes()).unwrap();
        assert_eq!(parsed.value, Some(Value::Text("a".repeat(67))));
    }

    #[test]
    fn test_parse_rejects_non_ascii_keyword() {
        let mut raw = [b' '; CARD_LEN];
        let prefix = "SIMPLEx\u{e9}= ".as_bytes();
        raw[..prefix.len()].copy_from_slice(prefix);
        let err = Card::parse(&raw).unwrap_err();
        assert!(matches!(err, StorageError::Format(_)));
    }

    #[test]
    fn test_header_blocks() {
        let mut header = Header::new();
        header.push(Card::new("SIMPLE", Value::Logical(true), ""));
        header.push(Card::new("BITPIX", Value::Integer(16), ""));
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), BLOCK_LEN);

        let (parsed, used) = Header::parse(&bytes).unwrap();
        assert_eq!(used, BLOCK_LEN);
        assert_eq!(parsed.get_bool("SIMPLE"), Some(true));
        assert_eq!(parsed.get_int("BITPIX"), Some(16));
        assert_eq!(parsed.get_float("BITPIX"), Some(16.0));
        assert_eq!(parsed.get_str("BITPIX"), None);
    }

    #[test]
    fn test_header_set_keeps_position() {
        let mut header = Header::new();
        header.push(Card::new("A", Value::Integer(1), ""));
        header.push(Card::new("B", Value::Integer(2), "second"));
        assert!(header.set("B", Value::Integer(5)));
        assert!(!header.set("C", Value::Integer(5)));
        assert_eq!(header.cards()[1].keyword, "B");
        assert_eq!(header.cards()[1].comment.as_deref(), Some("second"));
        assert_eq!(header.get_int("B"), Some(5));
    }

    #[test]
    fn test_missing_end() {
        let bytes = vec![b' '; BLOCK_LEN];
        assert!(Header::parse(&bytes).is_err());
    }
}
