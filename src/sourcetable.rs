//! Sourcetable field tokenizer and STR record parser

use strum::EnumString;

/// The literal three-byte quoted-delimiter escape used inside STR fields.
const QUOTED_SEMICOLON: &str = "\";\"";

/// A stateful, zero-copy iterator over the `;`-separated fields of one
/// sourcetable line.
///
/// Mirrors gpsd's `ntrip_field_iterate`: each call advances past any
/// `";"` escape sequences before looking for the next unescaped `;`. The
/// line is never mutated (safe Rust has no need to NUL-terminate in
/// place) — fields borrow straight out of the input.
pub struct FieldIter<'a> {
    rest: Option<&'a str>,
}

impl<'a> FieldIter<'a> {
    pub fn new(line: &'a str) -> Self {
        FieldIter { rest: Some(line) }
    }
}

impl<'a> Iterator for FieldIter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let s = self.rest?;

        // Walk forward from the current position: a `";"` run is an
        // escape and gets skipped, the first bare `;` after it is the
        // real field delimiter.
        let mut scan_from = 0;
        let split = loop {
            match s[scan_from..].find(['"', ';']) {
                None => break None,
                Some(rel) => {
                    let at = scan_from + rel;
                    if s[at..].starts_with(QUOTED_SEMICOLON) {
                        scan_from = at + QUOTED_SEMICOLON.len();
                    } else if s.as_bytes()[at] == b';' {
                        break Some(at);
                    } else {
                        // A lone '"' with no matching escape triple; not a
                        // delimiter, keep scanning past it.
                        scan_from = at + 1;
                    }
                },
            }
        };

        match split {
            Some(at) => {
                self.rest = Some(&s[at + 1..]);
                Some(&s[..at])
            },
            None => {
                self.rest = None;
                Some(s)
            },
        }
    }
}

/// RTCM stream format, folded case-insensitively and permissively.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StreamFormat {
    Rtcm2,
    Rtcm2_0,
    Rtcm2_1,
    Rtcm2_2,
    Rtcm2_3,
    Rtcm3_0,
    Rtcm3_1,
    Rtcm3_2,
    Rtcm3_3,
    #[default]
    Unknown,
}

/// Token -> variant table, matched case-insensitively. Kept as data (per
/// the Design Notes) rather than a chain of `if`s so the permissive
/// spellings stay auditable in one place.
const FORMAT_TABLE: &[(&str, StreamFormat)] = &[
    ("rtcm 2", StreamFormat::Rtcm2),
    ("rtcm2", StreamFormat::Rtcm2),
    ("rtcm 2.0", StreamFormat::Rtcm2_0),
    ("rtcm2.0", StreamFormat::Rtcm2_0),
    ("rtcm 2.1", StreamFormat::Rtcm2_1),
    ("rtcm2.1", StreamFormat::Rtcm2_1),
    ("rtcm 2.2", StreamFormat::Rtcm2_2),
    ("rtcm22", StreamFormat::Rtcm2_2),
    ("rtcm2.2", StreamFormat::Rtcm2_2),
    ("rtcm2.3", StreamFormat::Rtcm2_3),
    ("rtcm 2.3", StreamFormat::Rtcm2_3),
    // SAPOS (Germany) vendor token, confirmed RTCM2.3 by gpsd.
    ("rtcm1_", StreamFormat::Rtcm2_3),
    ("rtcm 3", StreamFormat::Rtcm3_0),
    ("rtcm 3.0", StreamFormat::Rtcm3_0),
    ("rtcm3.0", StreamFormat::Rtcm3_0),
    ("rtcm3", StreamFormat::Rtcm3_0),
    ("rtcm3.1", StreamFormat::Rtcm3_1),
    ("rtcm 3.1", StreamFormat::Rtcm3_1),
    ("rtcm 3.2", StreamFormat::Rtcm3_2),
    ("rtcm32", StreamFormat::Rtcm3_2),
    ("rtcm 3.3", StreamFormat::Rtcm3_3),
];

impl StreamFormat {
    pub fn parse(token: &str) -> StreamFormat {
        FORMAT_TABLE
            .iter()
            .find(|(t, _)| t.eq_ignore_ascii_case(token))
            .map(|(_, fmt)| *fmt)
            .unwrap_or(StreamFormat::Unknown)
    }
}

/// `compr-encryp` STR field.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CompressionEncryption {
    #[default]
    None,
    Unknown,
}

impl CompressionEncryption {
    pub fn parse(token: &str) -> CompressionEncryption {
        if token == " " || token.is_empty() || token.eq_ignore_ascii_case("none") {
            CompressionEncryption::None
        } else {
            CompressionEncryption::Unknown
        }
    }
}

/// `authentication` STR field: `N`/`B`/`D` codes.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, EnumString)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(ascii_case_insensitive)]
pub enum Authentication {
    #[default]
    #[strum(serialize = "N")]
    None,
    #[strum(serialize = "B")]
    Basic,
    #[strum(serialize = "D")]
    Digest,
    Unknown,
}

impl Authentication {
    pub fn parse(token: &str) -> Authentication {
        token.parse().unwrap_or(Authentication::Unknown)
    }
}

/// A single mountpoint's advertised properties.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StreamDescriptor {
    pub mountpoint: String,
    pub format: StreamFormat,
    pub carrier: i32,
    /// NAN when absent.
    pub latitude: f64,
    /// NAN when absent.
    pub longitude: f64,
    pub nmea: i32,
    pub compr_encryp: CompressionEncryption,
    pub authentication: Authentication,
    pub fee: i32,
    pub bitrate: i32,
    /// True once a record has matched the requested mountpoint.
    pub set: bool,
}

impl Default for StreamDescriptor {
    fn default() -> Self {
        StreamDescriptor {
            mountpoint: String::new(),
            format: StreamFormat::default(),
            carrier: 0,
            latitude: f64::NAN,
            longitude: f64::NAN,
            nmea: 0,
            compr_encryp: CompressionEncryption::default(),
            authentication: Authentication::default(),
            fee: 0,
            bitrate: 0,
            set: false,
        }
    }
}

impl StreamDescriptor {
    /// Parse one `STR;...` line with the `STR;` prefix already stripped,
    /// in the fixed positional field order the NTRIP sourcetable uses.
    pub fn parse_str_fields<'a>(mut fields: FieldIter<'a>) -> StreamDescriptor {
        let mut hold = StreamDescriptor::default();

        hold.mountpoint = fields.next().unwrap_or_default().to_string();
        let _identifier = fields.next();
        if let Some(format) = fields.next() {
            hold.format = StreamFormat::parse(format);
            if hold.format == StreamFormat::Unknown {
                tracing::warn!("NTRIP: got unknown format {format:?}");
            }
        }
        let _format_details = fields.next();
        if let Some(carrier) = fields.next() {
            hold.carrier = carrier.trim().parse().unwrap_or(0);
        }
        let _nav_system = fields.next();
        let _network = fields.next();
        let _country = fields.next();
        if let Some(lat) = fields.next() {
            hold.latitude = lat.trim().parse().unwrap_or(f64::NAN);
        }
        if let Some(lon) = fields.next() {
            hold.longitude = lon.trim().parse().unwrap_or(f64::NAN);
        }
        if let Some(nmea) = fields.next() {
            hold.nmea = nmea.trim().parse().unwrap_or(0);
        }
        let _solution = fields.next();
        let _generator = fields.next();
        if let Some(compr) = fields.next() {
            hold.compr_encryp = CompressionEncryption::parse(compr);
            if hold.compr_encryp == CompressionEncryption::Unknown {
                tracing::warn!("NTRIP: got unknown {{compress,encrypt}}ion {compr:?}");
            }
        }
        if let Some(auth) = fields.next() {
            hold.authentication = Authentication::parse(auth);
            if hold.authentication == Authentication::Unknown {
                tracing::warn!("NTRIP: got unknown authentication {auth:?}");
            }
        }
        if let Some(fee) = fields.next() {
            hold.fee = fee.trim().parse().unwrap_or(0);
        }
        if let Some(bitrate) = fields.next() {
            hold.bitrate = bitrate.trim().parse().unwrap_or(0);
        }
        // ...misc fields, consumed and discarded.
        for _ in fields {}

        hold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> StreamDescriptor {
        StreamDescriptor::parse_str_fields(FieldIter::new(line))
    }

    #[test]
    fn tokenizer_splits_plain_fields() {
        let fields: Vec<_> = FieldIter::new("a;b;c").collect();
        assert_eq!(fields, vec!["a", "b", "c"]);
    }

    #[test]
    fn tokenizer_yields_empty_fields() {
        let fields: Vec<_> = FieldIter::new("a;;c").collect();
        assert_eq!(fields, vec!["a", "", "c"]);
    }

    #[test]
    fn tokenizer_handles_trailing_empty_field() {
        let fields: Vec<_> = FieldIter::new("a;b;").collect();
        assert_eq!(fields, vec!["a", "b", ""]);
    }

    #[test]
    fn tokenizer_does_not_split_inside_quoted_semicolon() {
        // `Is near: Zagreb";"Croatia` must stay intact as one field.
        let line = r#"MP;Is near: Zagreb";"Croatia;RTCM 3.0"#;
        let fields: Vec<_> = FieldIter::new(line).collect();
        assert_eq!(fields, vec!["MP", r#"Is near: Zagreb";"Croatia"#, "RTCM 3.0"]);
    }

    #[test]
    fn tokenizer_round_trips_modulo_separators() {
        let line = "one;two;three;";
        let fields: Vec<_> = FieldIter::new(line).collect();
        assert_eq!(fields.join(";"), line.trim_end_matches(';').to_string() + ";");
    }

    #[test]
    fn format_tokens_fold_permissively() {
        assert_eq!(StreamFormat::parse("RTCM3"), StreamFormat::Rtcm3_0);
        assert_eq!(StreamFormat::parse("RTCM 3.0"), StreamFormat::Rtcm3_0);
        assert_eq!(StreamFormat::parse("RTCM3.0"), StreamFormat::Rtcm3_0);
        assert_eq!(StreamFormat::parse("rtcm3.2"), StreamFormat::Rtcm3_2);
        assert_eq!(StreamFormat::parse("RTCM1_"), StreamFormat::Rtcm2_3);
        assert_eq!(StreamFormat::parse("bogus"), StreamFormat::Unknown);
    }

    #[test]
    fn compression_token_mapping() {
        assert_eq!(CompressionEncryption::parse(""), CompressionEncryption::None);
        assert_eq!(CompressionEncryption::parse(" "), CompressionEncryption::None);
        assert_eq!(
            CompressionEncryption::parse("NONE"),
            CompressionEncryption::None
        );
        assert_eq!(
            CompressionEncryption::parse("gzip"),
            CompressionEncryption::Unknown
        );
    }

    #[test]
    fn authentication_token_mapping() {
        assert_eq!(Authentication::parse("N"), Authentication::None);
        assert_eq!(Authentication::parse("b"), Authentication::Basic);
        assert_eq!(Authentication::parse("D"), Authentication::Digest);
        assert_eq!(Authentication::parse("x"), Authentication::Unknown);
    }

    #[test]
    fn parses_full_str_record() {
        let desc = parse(
            "MP1;Example;RTCM 3.0;1004(1);0;GPS;EUREF;DEU;46.44;16.50;1;0;gen;none;B;0;9600;misc",
        );
        assert_eq!(desc.mountpoint, "MP1");
        assert_eq!(desc.format, StreamFormat::Rtcm3_0);
        assert_eq!(desc.carrier, 0);
        assert!((desc.latitude - 46.44).abs() < 1e-9);
        assert!((desc.longitude - 16.50).abs() < 1e-9);
        assert_eq!(desc.nmea, 1);
        assert_eq!(desc.compr_encryp, CompressionEncryption::None);
        assert_eq!(desc.authentication, Authentication::Basic);
        assert_eq!(desc.fee, 0);
        assert_eq!(desc.bitrate, 9600);
    }

    #[test]
    fn missing_trailing_fields_leave_defaults() {
        let desc = parse("MP1;Example;RTCM 3.0");
        assert_eq!(desc.mountpoint, "MP1");
        assert_eq!(desc.format, StreamFormat::Rtcm3_0);
        assert!(desc.latitude.is_nan());
        assert!(desc.longitude.is_nan());
        assert_eq!(desc.nmea, 0);
        assert_eq!(desc.fee, 0);
        assert_eq!(desc.bitrate, 0);
    }
}
