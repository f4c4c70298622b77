#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum BelKind {
    Iob,
    Lut,
    Dff,
    Bank,
    Cfg,
}

impl BelKind {
    pub const ALL: [BelKind; 5] = [
        BelKind::Iob,
        BelKind::Lut,
        BelKind::Dff,
        BelKind::Bank,
        BelKind::Cfg,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            BelKind::Iob => "IOB",
            BelKind::Lut => "LUT",
            BelKind::Dff => "DFF",
            BelKind::Bank => "BANK",
            BelKind::Cfg => "CFG",
        }
    }
}

/// A bel name split into its kind and instance suffix, e.g. `LUT3` or `IOBA`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BelName<'a> {
    pub kind: BelKind,
    pub index: &'a str,
}

impl<'a> BelName<'a> {
    pub fn parse(name: &'a str) -> Option<Self> {
        let kind = BelKind::ALL
            .into_iter()
            .find(|kind| name.starts_with(kind.prefix()))?;
        let rest = &name[kind.prefix().len()..];
        let end = rest
            .find(|c: char| !is_word_char(c))
            .unwrap_or(rest.len());
        Some(BelName {
            kind,
            index: &rest[..end],
        })
    }

    pub fn number(&self) -> Option<usize> {
        self.index.parse().ok()
    }
}

impl std::fmt::Display for BelName<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.kind.prefix(), self.index)
    }
}

pub fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn split_digits(s: &str) -> Option<(usize, &str)> {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    Some((s[..end].parse().ok()?, &s[end..]))
}

/// Splits a `R<row>C<col>_<rest>` name into its 1-based tile coordinate and the rest.
pub fn split_tile_prefix(name: &str) -> Option<(usize, usize, &str)> {
    let (row, rest) = split_digits(name.strip_prefix('R')?)?;
    let (col, rest) = split_digits(rest.strip_prefix('C')?)?;
    let rest = rest.strip_prefix('_')?;
    Some((row, col, rest))
}

/// Scopes a tile-local name to a 1-based tile coordinate.
pub fn tile_scoped(row: usize, col: usize, name: &str) -> String {
    format!("R{row}C{col}_{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bel_name() {
        let lut = BelName::parse("LUT5").unwrap();
        assert_eq!(lut.kind, BelKind::Lut);
        assert_eq!(lut.number(), Some(5));
        let iob = BelName::parse("IOBB").unwrap();
        assert_eq!(iob.kind, BelKind::Iob);
        assert_eq!(iob.index, "B");
        assert_eq!(iob.number(), None);
        let bank = BelName::parse("BANK").unwrap();
        assert_eq!(bank.kind, BelKind::Bank);
        assert_eq!(bank.index, "");
        assert_eq!(BelName::parse("DFF2.X").unwrap().index, "2");
        assert_eq!(BelName::parse("SLICE0"), None);
        assert_eq!(lut.to_string(), "LUT5");
    }

    #[test]
    fn test_split_tile_prefix() {
        assert_eq!(split_tile_prefix("R12C3_SLICE2"), Some((12, 3, "SLICE2")));
        assert_eq!(split_tile_prefix("R1C1_A0_F0"), Some((1, 1, "A0_F0")));
        assert_eq!(split_tile_prefix("R1C_A0"), None);
        assert_eq!(split_tile_prefix("X1C1_A0"), None);
        assert_eq!(split_tile_prefix("R1C1A0"), None);
    }
}
