//! Round trip properties of the chunked codec.

mod common;

use std::io::{BufReader, Read, Write};

use bytes::{Bytes, BytesMut};
use micro_wire::codec::{ChunkedEncoder, ChunkedReader, ChunkedWriter};
use micro_wire::protocol::PayloadItem;
use proptest::prelude::*;
use tokio_util::codec::Encoder;

fn body() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(any::<u8>(), 0..4096)
}

fn encode_with_writer(body: &[u8], chunk_size: usize) -> Vec<u8> {
    let mut writer = ChunkedWriter::with_chunk_size(chunk_size, Vec::new());
    writer.write_all(body).unwrap();
    writer.close().unwrap();
    writer.into_inner()
}

proptest! {
    #[test]
    fn writer_then_reader_round_trip(body in body(), chunk_size in 1usize..600, capacity in 1usize..64) {
        let wire = encode_with_writer(&body, chunk_size);

        let mut reader = ChunkedReader::new(BufReader::with_capacity(capacity, &wire[..]));
        let mut decoded = Vec::new();
        reader.read_to_end(&mut decoded).unwrap();

        prop_assert_eq!(decoded, body);
        prop_assert!(reader.is_exhausted());
    }
}

proptest! {
    #[test]
    fn writer_then_decoder_round_trip(body in body(), chunk_size in 1usize..600, step in 1usize..32) {
        let wire = encode_with_writer(&body, chunk_size);

        let (decoded, rest) = common::decode_in_steps(&wire, step).unwrap();
        prop_assert_eq!(decoded, body);
        prop_assert!(rest.is_empty());
    }
}

proptest! {
    #[test]
    fn writer_chunks_never_exceed_chunk_size(body in body(), chunk_size in 1usize..600) {
        let wire = encode_with_writer(&body, chunk_size);

        let mut expected = BytesMut::new();
        let mut encoder = ChunkedEncoder::new();
        for chunk in body.chunks(chunk_size) {
            encoder.encode(PayloadItem::Chunk(Bytes::copy_from_slice(chunk)), &mut expected).unwrap();
        }
        encoder.encode(PayloadItem::<Bytes>::Eof, &mut expected).unwrap();

        prop_assert_eq!(&wire[..], &expected[..]);
    }
}

proptest! {
    #[test]
    fn encoder_then_decoder_round_trip(chunks in proptest::collection::vec(body(), 0..8), step in 1usize..64) {
        let mut wire = BytesMut::new();
        let mut encoder = ChunkedEncoder::new();
        for chunk in &chunks {
            encoder.encode(PayloadItem::Chunk(&chunk[..]), &mut wire).unwrap();
        }
        encoder.encode(PayloadItem::<&[u8]>::Eof, &mut wire).unwrap();

        let (decoded, _) = common::decode_in_steps(&wire, step).unwrap();
        prop_assert_eq!(decoded, chunks.concat());
    }
}

proptest! {
    #[test]
    fn truncated_wire_never_decodes(body in proptest::collection::vec(any::<u8>(), 1..512), cut in 1usize..5) {
        let wire = encode_with_writer(&body, 100);
        let truncated = &wire[..wire.len() - cut];

        let mut decoded = Vec::new();
        prop_assert!(ChunkedReader::new(truncated).read_to_end(&mut decoded).is_err());
        prop_assert!(common::decode_in_steps(truncated, 7).is_err());
    }
}
