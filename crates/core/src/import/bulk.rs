use std::{fmt, str::FromStr};

use anyhow::anyhow;
use tracing::debug;

use super::rows::{is_header_row, map_row};
use crate::{models::Card, normalize::normalize};

/// Column separators accepted for pasted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Comma,
    Tab,
    Semicolon,
    Pipe,
}

impl Delimiter {
    /// Candidates in tie-break order.
    pub const ALL: [Delimiter; 4] = [
        Delimiter::Comma,
        Delimiter::Tab,
        Delimiter::Semicolon,
        Delimiter::Pipe,
    ];

    /// Separator character.
    pub fn as_char(self) -> char {
        match self {
            Delimiter::Comma => ',',
            Delimiter::Tab => '\t',
            Delimiter::Semicolon => ';',
            Delimiter::Pipe => '|',
        }
    }

    /// Pick the separator giving the most columns while every non-blank
    /// line splits into the same number of them. Falls back to comma.
    pub fn detect(text: &str) -> Delimiter {
        let lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();
        let mut best: Option<(Delimiter, usize)> = None;
        for delimiter in Self::ALL {
            let mut counts = lines.iter().map(|line| split_row(line, delimiter).len());
            let Some(first) = counts.next() else {
                break;
            };
            if first < 2 || !counts.all(|count| count == first) {
                continue;
            }
            if best.map(|(_, columns)| first > columns).unwrap_or(true) {
                best = Some((delimiter, first));
            }
        }
        best.map(|(delimiter, _)| delimiter)
            .unwrap_or(Delimiter::Comma)
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Delimiter::Comma => "comma",
            Delimiter::Tab => "tab",
            Delimiter::Semicolon => "semicolon",
            Delimiter::Pipe => "pipe",
        };
        f.write_str(name)
    }
}

impl FromStr for Delimiter {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "comma" | "," => Ok(Delimiter::Comma),
            "tab" | "\\t" | "\t" => Ok(Delimiter::Tab),
            "semicolon" | ";" => Ok(Delimiter::Semicolon),
            "pipe" | "|" => Ok(Delimiter::Pipe),
            other => Err(anyhow!("unknown delimiter '{other}'")),
        }
    }
}

/// How the first row of pasted text is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderMode {
    /// Header when one of its cells names the card name column.
    #[default]
    Auto,
    Present,
    Absent,
}

/// Options for [`parse_bulk`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BulkOptions {
    /// Explicit separator; detected when `None`.
    pub delimiter: Option<Delimiter>,
    pub header: HeaderMode,
}

/// Outcome of a bulk parse.
#[derive(Debug, Clone)]
pub struct BulkImport {
    /// Normalized cards, in row order.
    pub cards: Vec<Card>,
    /// Rows dropped for lacking a name.
    pub skipped: usize,
    /// Separator that was used.
    pub delimiter: Delimiter,
}

/// Split one line into trimmed cells, honouring double quotes (`""` is an
/// escaped quote inside a quoted cell).
pub fn split_row(line: &str, delimiter: Delimiter) -> Vec<String> {
    let separator = delimiter.as_char();
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ch if ch == separator && !in_quotes => {
                cells.push(current.trim().to_string());
                current.clear();
            }
            ch => current.push(ch),
        }
    }
    cells.push(current.trim().to_string());
    cells
}

/// Turn pasted delimited text into normalized cards.
pub fn parse_bulk(text: &str, options: &BulkOptions) -> BulkImport {
    let delimiter = options.delimiter.unwrap_or_else(|| Delimiter::detect(text));
    let mut rows = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| split_row(line, delimiter))
        .peekable();

    let has_header = match options.header {
        HeaderMode::Present => true,
        HeaderMode::Absent => false,
        HeaderMode::Auto => rows.peek().map(|row| is_header_row(row)).unwrap_or(false),
    };
    let headers = if has_header { rows.next() } else { None };

    let mut cards = Vec::new();
    let mut skipped = 0;
    for row in rows {
        match map_row(headers.as_deref(), &row) {
            Some(raw) => cards.push(normalize(&raw)),
            None => skipped += 1,
        }
    }

    debug!(
        %delimiter,
        header = has_header,
        cards = cards.len(),
        skipped,
        "parsed bulk text"
    );
    BulkImport {
        cards,
        skipped,
        delimiter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Print;

    #[test]
    fn splits_quoted_cells() {
        assert_eq!(
            split_row(r#"Taxi, "Car, Van" ,"say ""hi""""#, Delimiter::Comma),
            vec!["Taxi", "Car, Van", r#"say "hi""#]
        );
        assert_eq!(split_row("a||b", Delimiter::Pipe), vec!["a", "", "b"]);
    }

    #[test]
    fn detects_consistent_delimiters() {
        assert_eq!(Delimiter::detect("a\tb\tc\n1\t2\t3\n"), Delimiter::Tab);
        assert_eq!(Delimiter::detect("a;b\n\n1;2"), Delimiter::Semicolon);
        assert_eq!(Delimiter::detect("a|b|c\n1|2|3"), Delimiter::Pipe);
        // Commas are inconsistent here, pipes are not.
        assert_eq!(Delimiter::detect("a, b|c\n1|2"), Delimiter::Pipe);
        assert_eq!(Delimiter::detect("single"), Delimiter::Comma);
        assert_eq!(Delimiter::detect(""), Delimiter::Comma);
    }

    #[test]
    fn parses_delimiter_names() {
        assert_eq!("Tab".parse::<Delimiter>().unwrap(), Delimiter::Tab);
        assert_eq!("|".parse::<Delimiter>().unwrap(), Delimiter::Pipe);
        assert!("colon".parse::<Delimiter>().is_err());
    }

    #[test]
    fn parses_headed_text_and_counts_skips() {
        let text = "Name,Type,Set,CardNumber\nTaxi,Vehicle,Core,007\n,Vehicle,Core,008\n\nBus,Vehicle,,\n";
        let import = parse_bulk(text, &BulkOptions::default());

        assert_eq!(import.delimiter, Delimiter::Comma);
        assert_eq!(import.skipped, 1);
        assert_eq!(import.cards.len(), 2);
        assert_eq!(import.cards[0].prints, vec![Print::new("Core", "007", true)]);
        assert!(import.cards[1].prints.is_empty());
    }

    #[test]
    fn positional_text_without_header() {
        let options = BulkOptions {
            delimiter: Some(Delimiter::Pipe),
            header: HeaderMode::Absent,
        };
        let import = parse_bulk("Taxi|Vehicle|Common|Core|7", &options);
        assert_eq!(import.cards.len(), 1);
        let card = &import.cards[0];
        assert_eq!(card.rarity, "Common");
        assert_eq!(card.set_name, "Core");
        assert_eq!(card.card_number, "7");
    }
}
