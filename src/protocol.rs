//! The LDAP message envelope codec.
//!
//! Every PDU on the wire is a `SEQUENCE { messageID INTEGER, protocolOp
//! CHOICE { ... }, controls [0] Controls OPTIONAL }`. This module is the
//! only place that peels that envelope off (or puts it back on); everything
//! above it works with `(message id, protocolOp tag, raw controls)` triples.

use std::io;

use bytes::BytesMut;
use log::trace;
use tokio_util::codec::{Decoder, Encoder};

use lber::parse::parse_tag;
use lber::structure::StructureTag;
use lber::structures::{ASNTag, Integer, Sequence, Tag};
use lber::universal::Types;
use lber::write;

use crate::controls_impl::{encode_controls, RawControl};

/// An outbound message: a message id, the protocol-op tag, and an optional
/// set of request controls.
pub struct Msg {
    pub id: i32,
    pub op: Tag,
    pub ctrls: Option<Vec<RawControl>>,
}

#[derive(Default)]
pub struct LdapCodec;

impl Decoder for LdapCodec {
    type Item = (i32, Tag, Option<StructureTag>);
    type Error = io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> io::Result<Option<Self::Item>> {
        let (consumed, tag) = match parse_tag(buf) {
            Ok((rest, tag)) => (buf.len() - rest.len(), tag),
            Err(nom::Err::Incomplete(_)) => return Ok(None),
            Err(_) => return Err(io::Error::new(io::ErrorKind::InvalidData, "BER decode error")),
        };
        buf.split_to(consumed);
        let mut tags = match tag
            .match_id(Types::Sequence as u64)
            .and_then(|t| t.expect_constructed())
        {
            Some(tags) if tags.len() == 2 || tags.len() == 3 => tags,
            _ => return Err(io::Error::new(io::ErrorKind::InvalidData, "malformed LDAPMessage")),
        };
        let maybe_ctrls = if tags.len() == 3 { tags.pop() } else { None };
        let protoop = tags.pop().expect("protocolOp");
        let id_tag = tags.pop().expect("messageID");
        let id_bytes = id_tag
            .expect_primitive()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "messageID not primitive"))?;
        let id = id_bytes.iter().fold(0i64, |acc, &b| (acc << 8) | b as i64) as i32;
        trace!("decoded message id {}, {} bytes left in buffer", id, buf.len());
        Ok(Some((id, Tag::StructureTag(protoop), maybe_ctrls)))
    }
}

impl Encoder<Msg> for LdapCodec {
    type Error = io::Error;

    fn encode(&mut self, msg: Msg, into: &mut BytesMut) -> io::Result<()> {
        let mut inner = vec![
            Tag::Integer(Integer {
                inner: msg.id as i64,
                ..Default::default()
            }),
            msg.op,
        ];
        if let Some(ctrls) = msg.ctrls {
            if !ctrls.is_empty() {
                inner.push(Tag::StructureTag(encode_controls(ctrls)));
            }
        }
        let envelope = Tag::Sequence(Sequence {
            inner,
            ..Default::default()
        })
        .into_structure();
        trace!("sending packet: {:?}", &envelope);
        write::encode_into(into, envelope)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use futures_util::{SinkExt, StreamExt};
    use lber::common::TagClass;
    use lber::structures::Null;
    use tokio_util::codec::Framed;

    #[test]
    fn round_trip_through_buffer() {
        let mut buf = BytesMut::new();
        let op = Tag::Null(Null {
            id: 2,
            class: TagClass::Application,
            inner: (),
        });
        let mut codec = LdapCodec;
        codec
            .encode(
                Msg {
                    id: 7,
                    op,
                    ctrls: None,
                },
                &mut buf,
            )
            .unwrap();
        let (id, tag, ctrls) = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(id, 7);
        assert!(ctrls.is_none());
        match tag {
            Tag::StructureTag(t) => {
                assert_eq!(t.id, 2);
                assert_eq!(t.class, TagClass::Application);
            }
            _ => panic!("expected StructureTag"),
        }
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn round_trip_through_duplex() {
        let (client, server) = tokio::io::duplex(4096);
        let mut client = Framed::new(client, LdapCodec);
        let mut server = Framed::new(server, LdapCodec);

        let op = Tag::Integer(Integer {
            id: 16,
            class: TagClass::Application,
            inner: 42,
        });
        client
            .send(Msg {
                id: 3,
                op,
                ctrls: None,
            })
            .await
            .unwrap();

        let (id, tag, ctrls) = server.next().await.unwrap().unwrap();
        assert_eq!(id, 3);
        assert!(ctrls.is_none());
        match tag {
            Tag::StructureTag(t) => assert_eq!(t.id, 16),
            _ => panic!("expected StructureTag"),
        }
    }
}
