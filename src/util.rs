use std::borrow::Cow;

/// Escape a filter literal.
///
/// Literal values appearing in an LDAP filter can contain any character,
/// but some characters (parentheses, asterisk, backslash, NUL) must be
/// escaped in the filter's string representation. This function does the
/// escaping.
///
/// The argument, `lit`, can be owned or borrowed. The function doesn't
/// allocate the return value unless there's need to escape the input.
pub fn ldap_escape<'a, S: Into<Cow<'a, str>>>(lit: S) -> Cow<'a, str> {
    #[inline]
    fn needs_escape(c: u8) -> bool {
        c == b'\\' || c == b'*' || c == b'(' || c == b')' || c == 0
    }

    #[inline]
    fn xdigit(c: u8) -> u8 {
        c + if c < 10 { b'0' } else { b'a' - 10 }
    }

    let lit = lit.into();
    let mut output = None;
    for (i, &c) in lit.as_bytes().iter().enumerate() {
        if needs_escape(c) {
            if output.is_none() {
                output = Some(Vec::with_capacity(lit.len() + 12)); // guess: up to 4 escaped chars
                output.as_mut().unwrap().extend(lit[..i].as_bytes());
            }
            let output = output.as_mut().unwrap();
            output.push(b'\\');
            output.push(xdigit(c >> 4));
            output.push(xdigit(c & 0xF));
        } else if let Some(ref mut output) = output {
            output.push(c);
        }
    }
    if let Some(output) = output {
        // unchecked conversion is safe here: we receive a valid
        // UTF-8 value, by definition, and only replace single ASCII
        // bytes with ASCII byte sequences
        Cow::Owned(unsafe { String::from_utf8_unchecked(output) })
    } else {
        lit.into()
    }
}

/// Escape a DN/RDN attribute value, per the rules of
/// [RFC 4514](https://tools.ietf.org/html/rfc4514#section-2.4).
///
/// A leading space or `#`, a trailing space, and any of `"+,;<>\` anywhere
/// in the value must be escaped with a backslash. A NUL byte is escaped as
/// `\00`. This is a simpler grammar than filter escaping, and unrelated to
/// it; the two must not be confused.
pub fn dn_escape<'a, S: Into<Cow<'a, str>>>(val: S) -> Cow<'a, str> {
    #[inline]
    fn needs_escape(c: u8) -> bool {
        matches!(c, b'"' | b'+' | b',' | b';' | b'<' | b'>' | b'\\' | 0)
    }

    let val = val.into();
    let bytes = val.as_bytes();
    let mut output: Option<Vec<u8>> = None;
    let last = bytes.len().saturating_sub(1);

    for (i, &c) in bytes.iter().enumerate() {
        let special_position = (i == 0 && (c == b' ' || c == b'#')) || (i == last && c == b' ');
        if needs_escape(c) || special_position {
            if output.is_none() {
                let mut buf = Vec::with_capacity(val.len() + 8);
                buf.extend_from_slice(&bytes[..i]);
                output = Some(buf);
            }
            let buf = output.as_mut().unwrap();
            buf.push(b'\\');
            if c == 0 {
                buf.extend_from_slice(b"00");
            } else {
                buf.push(c);
            }
        } else if let Some(ref mut buf) = output {
            buf.push(c);
        }
    }

    if let Some(buf) = output {
        Cow::Owned(unsafe { String::from_utf8_unchecked(buf) })
    } else {
        val
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn filter_escape_passthrough() {
        assert_eq!(ldap_escape("plain"), "plain");
    }

    #[test]
    fn filter_escape_special_chars() {
        assert_eq!(ldap_escape("a(b)*c\\d"), "a\\28b\\29\\2ac\\5cd");
    }

    #[test]
    fn dn_escape_leading_space_and_hash() {
        assert_eq!(dn_escape(" #foo"), "\\ \\#foo");
    }

    #[test]
    fn dn_escape_trailing_space() {
        assert_eq!(dn_escape("foo "), "foo\\ ");
    }

    #[test]
    fn dn_escape_commas_and_plus() {
        assert_eq!(dn_escape("a,b+c"), "a\\,b\\+c");
    }
}
