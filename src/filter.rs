//! LDAP search filter parser ([RFC 4515](https://tools.ietf.org/html/rfc4515)).
//!
//! Converts the string representation of a filter into the `Tag` tree the
//! wire encoder expects. Not re-exported as part of the public filter-DSL
//! surface; callers pass filter strings to `search()` and friends, which
//! invoke this module internally.

use std::fmt;

use lber::common::TagClass;
use lber::structures::{Boolean, ExplicitTag, OctetString, Sequence, Tag};

use nom::branch::alt;
use nom::bytes::complete::{tag as ntag, take_while, take_while1};
use nom::character::complete::{char, digit1};
use nom::combinator::{map, map_res, opt, recognize, verify};
use nom::multi::{fold_many0, many0, many1};
use nom::number::complete::be_u8;
use nom::sequence::{delimited, preceded};
use nom::IResult;

/// A filter string did not conform to RFC 4515 syntax.
#[derive(Clone, Debug)]
pub struct FilterParseError(String);

impl fmt::Display for FilterParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "malformed filter: {}", self.0)
    }
}

impl std::error::Error for FilterParseError {}

fn err(input: &str) -> FilterParseError {
    FilterParseError(input.to_owned())
}

pub fn parse(input: &str) -> Result<Tag, FilterParseError> {
    match filtexpr(input.as_bytes()) {
        Ok((rest, t)) if rest.is_empty() => Ok(t),
        Ok(_) => Err(err(input)),
        Err(_) => Err(err(input)),
    }
}

pub(crate) fn parse_matched_values(input: &str) -> Result<Tag, FilterParseError> {
    match mv_filtexpr(input.as_bytes()) {
        Ok((rest, t)) if rest.is_empty() => Ok(t),
        Ok(_) => Err(err(input)),
        Err(_) => Err(err(input)),
    }
}

const AND_FILT: u64 = 0;
const OR_FILT: u64 = 1;
const NOT_FILT: u64 = 2;

const EQ_MATCH: u64 = 3;
const SUBSTR_MATCH: u64 = 4;
const GTE_MATCH: u64 = 5;
const LTE_MATCH: u64 = 6;
const PRES_MATCH: u64 = 7;
const APPROX_MATCH: u64 = 8;
const EXT_MATCH: u64 = 9;

const SUB_INITIAL: u64 = 0;
const SUB_ANY: u64 = 1;
const SUB_FINAL: u64 = 2;

type In<'a> = &'a [u8];

fn filtexpr(i: In) -> IResult<In, Tag> {
    alt((filter, item))(i)
}

fn filter(i: In) -> IResult<In, Tag> {
    delimited(char('('), filtercomp, char(')'))(i)
}

fn filtercomp(i: In) -> IResult<In, Tag> {
    alt((and, or, not, item))(i)
}

fn filterlist(i: In) -> IResult<In, Vec<Tag>> {
    many0(filter)(i)
}

fn mv_filtexpr(i: In) -> IResult<In, Tag> {
    delimited(char('('), mv_filterlist, char(')'))(i)
}

fn mv_filteritems(i: In) -> IResult<In, Vec<Tag>> {
    many1(delimited(char('('), item, char(')')))(i)
}

fn mv_filterlist(i: In) -> IResult<In, Tag> {
    map(mv_filteritems, |tagv: Vec<Tag>| {
        Tag::Sequence(Sequence {
            inner: tagv,
            ..Default::default()
        })
    })(i)
}

fn and(i: In) -> IResult<In, Tag> {
    map(preceded(char('&'), filterlist), |tagv: Vec<Tag>| {
        Tag::Sequence(Sequence {
            class: TagClass::Context,
            id: AND_FILT,
            inner: tagv,
        })
    })(i)
}

fn or(i: In) -> IResult<In, Tag> {
    map(preceded(char('|'), filterlist), |tagv: Vec<Tag>| {
        Tag::Sequence(Sequence {
            class: TagClass::Context,
            id: OR_FILT,
            inner: tagv,
        })
    })(i)
}

fn not(i: In) -> IResult<In, Tag> {
    map(preceded(char('!'), filter), |tag: Tag| {
        Tag::ExplicitTag(ExplicitTag {
            class: TagClass::Context,
            id: NOT_FILT,
            inner: Box::new(tag),
        })
    })(i)
}

fn item(i: In) -> IResult<In, Tag> {
    alt((eq, non_eq, extensible))(i)
}

enum Unescaper {
    WantFirst,
    WantSecond(u8),
    Value(u8),
    Error,
}

fn hex_digit_val(c: u8) -> u8 {
    if c.is_ascii_digit() {
        c - b'0'
    } else {
        (c.to_ascii_uppercase()) - b'A' + 10
    }
}

impl Unescaper {
    fn feed(&self, c: u8) -> Unescaper {
        match *self {
            Unescaper::Error => Unescaper::Error,
            Unescaper::WantFirst => {
                if c.is_ascii_hexdigit() {
                    Unescaper::WantSecond(hex_digit_val(c))
                } else {
                    Unescaper::Error
                }
            }
            Unescaper::WantSecond(partial) => {
                if c.is_ascii_hexdigit() {
                    Unescaper::Value((partial << 4) + hex_digit_val(c))
                } else {
                    Unescaper::Error
                }
            }
            Unescaper::Value(_v) => {
                if c != b'\\' {
                    Unescaper::Value(c)
                } else {
                    Unescaper::WantFirst
                }
            }
        }
    }
}

fn is_value_char(c: u8) -> bool {
    c != 0 && c != b'(' && c != b')' && c != b'*'
}

// Any byte in the assertion value may be represented by \NN, where N is a
// hex digit. Some characters (parentheses, asterisk, backslash itself) must
// be represented this way.
fn unescaped(i: In) -> IResult<In, Vec<u8>> {
    map_res(
        fold_many0(
            verify(be_u8, |c: &u8| is_value_char(*c)),
            || (Unescaper::Value(0), Vec::new()),
            |(mut u, mut vec): (Unescaper, Vec<u8>), c: u8| {
                u = u.feed(c);
                if let Unescaper::Value(c) = u {
                    vec.push(c);
                }
                (u, vec)
            },
        ),
        |(u, vec): (Unescaper, Vec<u8>)| -> Result<Vec<u8>, ()> {
            if let Unescaper::Value(_) = u {
                Ok(vec)
            } else {
                Err(())
            }
        },
    )(i)
}

fn filtertag(filterop: &[u8]) -> u64 {
    match filterop {
        b">=" => GTE_MATCH,
        b"<=" => LTE_MATCH,
        b"~=" => APPROX_MATCH,
        _ => unreachable!("alt! only offers these three tags"),
    }
}

fn non_eq(i: In) -> IResult<In, Tag> {
    let (i, attr) = attributedescription(i)?;
    let (i, filterop) = alt((ntag(">="), ntag("<="), ntag("~=")))(i)?;
    let (i, value) = unescaped(i)?;
    Ok((
        i,
        Tag::Sequence(Sequence {
            class: TagClass::Context,
            id: filtertag(filterop),
            inner: vec![
                Tag::OctetString(OctetString {
                    inner: attr.to_vec(),
                    ..Default::default()
                }),
                Tag::OctetString(OctetString {
                    inner: value,
                    ..Default::default()
                }),
            ],
        }),
    ))
}

fn eq(i: In) -> IResult<In, Tag> {
    let (i, attr) = attributedescription(i)?;
    let (i, _) = char('=')(i)?;
    let (i, initial) = unescaped(i)?;
    let (i, mid_final) = map_res(
        many0(preceded(ntag("*"), unescaped)),
        |v: Vec<Vec<u8>>| -> Result<Vec<Vec<u8>>, ()> {
            // An empty element may exist only at the very end; otherwise we
            // have two adjacent asterisks.
            if v.iter()
                .enumerate()
                .any(|(n, ve)| ve.is_empty() && n + 1 != v.len())
            {
                Err(())
            } else {
                Ok(v)
            }
        },
    )(i)?;
    let tag = if mid_final.is_empty() {
        Tag::Sequence(Sequence {
            class: TagClass::Context,
            id: EQ_MATCH,
            inner: vec![
                Tag::OctetString(OctetString {
                    inner: attr.to_vec(),
                    ..Default::default()
                }),
                Tag::OctetString(OctetString {
                    inner: initial,
                    ..Default::default()
                }),
            ],
        })
    } else if initial.is_empty() && mid_final.len() == 1 && mid_final[0].is_empty() {
        Tag::OctetString(OctetString {
            class: TagClass::Context,
            id: PRES_MATCH,
            inner: attr.to_vec(),
        })
    } else {
        let mut inner = vec![];
        if !initial.is_empty() {
            inner.push(Tag::OctetString(OctetString {
                class: TagClass::Context,
                id: SUB_INITIAL,
                inner: initial,
            }));
        }
        let n = mid_final.len();
        for (idx, sub_elem) in mid_final.into_iter().enumerate() {
            if sub_elem.is_empty() {
                break;
            }
            inner.push(Tag::OctetString(OctetString {
                class: TagClass::Context,
                id: if idx + 1 != n { SUB_ANY } else { SUB_FINAL },
                inner: sub_elem,
            }));
        }
        Tag::Sequence(Sequence {
            class: TagClass::Context,
            id: SUBSTR_MATCH,
            inner: vec![
                Tag::OctetString(OctetString {
                    inner: attr.to_vec(),
                    ..Default::default()
                }),
                Tag::Sequence(Sequence {
                    inner,
                    ..Default::default()
                }),
            ],
        })
    };
    Ok((i, tag))
}

fn extensible(i: In) -> IResult<In, Tag> {
    alt((attr_dn_mrule, dn_mrule))(i)
}

fn attr_dn_mrule(i: In) -> IResult<In, Tag> {
    let (i, attr) = attributedescription(i)?;
    let (i, dn) = opt(ntag(":dn"))(i)?;
    let (i, mrule) = opt(preceded(char(':'), attributetype))(i)?;
    let (i, _) = ntag(":=")(i)?;
    let (i, value) = unescaped(i)?;
    Ok((i, extensible_tag(mrule, Some(attr), value, dn.is_some())))
}

fn dn_mrule(i: In) -> IResult<In, Tag> {
    let (i, dn) = opt(ntag(":dn"))(i)?;
    let (i, mrule) = preceded(char(':'), attributetype)(i)?;
    let (i, _) = ntag(":=")(i)?;
    let (i, value) = unescaped(i)?;
    Ok((i, extensible_tag(Some(mrule), None, value, dn.is_some())))
}

fn extensible_tag(mrule: Option<&[u8]>, attr: Option<&[u8]>, value: Vec<u8>, dn: bool) -> Tag {
    let mut inner = vec![];
    if let Some(mrule) = mrule {
        inner.push(Tag::OctetString(OctetString {
            class: TagClass::Context,
            id: 1,
            inner: mrule.to_vec(),
        }));
    }
    if let Some(attr) = attr {
        inner.push(Tag::OctetString(OctetString {
            class: TagClass::Context,
            id: 2,
            inner: attr.to_vec(),
        }));
    }
    inner.push(Tag::OctetString(OctetString {
        class: TagClass::Context,
        id: 3,
        inner: value,
    }));
    if dn {
        inner.push(Tag::Boolean(Boolean {
            class: TagClass::Context,
            id: 4,
            inner: dn,
        }));
    }
    Tag::Sequence(Sequence {
        class: TagClass::Context,
        id: EXT_MATCH,
        inner,
    })
}

fn attributedescription(i: In) -> IResult<In, &[u8]> {
    recognize(|i| -> IResult<In, ()> {
        let (i, _) = attributetype(i)?;
        let (i, _) = many0(preceded(char(';'), take_while1(is_alnum_hyphen)))(i)?;
        Ok((i, ()))
    })(i)
}

fn attributetype(i: In) -> IResult<In, &[u8]> {
    alt((numericoid, descr))(i)
}

fn numericoid(i: In) -> IResult<In, &[u8]> {
    recognize(|i| -> IResult<In, ()> {
        let (i, _) = number(i)?;
        let (i, _) = many0(preceded(char('.'), number))(i)?;
        Ok((i, ()))
    })(i)
}

// A number may be zero, but must not have superfluous leading zeroes.
fn number(i: In) -> IResult<In, &[u8]> {
    verify(digit1, |d: &[u8]| d.len() == 1 || d[0] != b'0')(i)
}

fn descr(i: In) -> IResult<In, &[u8]> {
    recognize(|i| -> IResult<In, ()> {
        let (i, _) = verify(be_u8, |c: &u8| c.is_ascii_alphabetic())(i)?;
        let (i, _) = take_while(is_alnum_hyphen)(i)?;
        Ok((i, ()))
    })(i)
}

fn is_alnum_hyphen(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'-'
}

#[cfg(test)]
mod test {
    use super::*;
    use lber::structure::PL;

    fn tag_id(t: &Tag) -> (TagClass, u64) {
        match t {
            Tag::Boolean(b) => (b.class, b.id),
            Tag::OctetString(o) => (o.class, o.id),
            Tag::Sequence(s) => (s.class, s.id),
            Tag::ExplicitTag(e) => (e.class, e.id),
            _ => panic!("unexpected tag variant in filter output"),
        }
    }

    #[test]
    fn equality() {
        let t = parse("(cn=Babs Jensen)").unwrap();
        assert_eq!(tag_id(&t), (TagClass::Context, EQ_MATCH));
    }

    #[test]
    fn presence() {
        let t = parse("(mail=*)").unwrap();
        assert_eq!(tag_id(&t), (TagClass::Context, PRES_MATCH));
    }

    #[test]
    fn and_of_two_equalities() {
        let t = parse("(&(objectClass=person)(cn=Babs))").unwrap();
        match t {
            Tag::Sequence(Sequence { id, inner, .. }) => {
                assert_eq!(id, AND_FILT);
                assert_eq!(inner.len(), 2);
            }
            _ => panic!("expected Sequence for AND"),
        }
    }

    #[test]
    fn substring() {
        let t = parse("(cn=Babs*)").unwrap();
        assert_eq!(tag_id(&t), (TagClass::Context, SUBSTR_MATCH));
    }

    #[test]
    fn negation() {
        let t = parse("(!(cn=Babs))").unwrap();
        match t {
            Tag::ExplicitTag(e) => assert_eq!(e.id, NOT_FILT),
            _ => panic!("expected ExplicitTag for NOT"),
        }
    }

    #[test]
    fn rejects_unbalanced_parens() {
        assert!(parse("(cn=Babs").is_err());
    }

    #[test]
    fn escaped_value_byte() {
        let t = parse(r"(cn=Lu\c4\8di\c4\87)").unwrap();
        match t {
            Tag::Sequence(Sequence { inner, .. }) => match &inner[1] {
                Tag::OctetString(OctetString { inner: value, .. }) => {
                    assert_eq!(String::from_utf8(value.clone()).unwrap(), "Lučić");
                }
                _ => panic!("expected OctetString value"),
            },
            _ => panic!("expected Sequence for equality match"),
        }
    }
}
