use proptest::prelude::*;
use std::collections::BTreeMap;
use streamcodec::state::{StateReader, StateWriter};
use streamcodec::*;

proptest! {
    #[test]
    fn varint_u32_within_five_bytes(value in any::<u32>()) {
        let mut out = Vec::new();
        varint::write_u32(value, &mut out).unwrap();
        prop_assert!(out.len() <= varint::MAX_LEN_32);
        prop_assert_eq!(out.len(), varint::encoded_len(value as u64));
        prop_assert_eq!(varint::read_u32(&mut &out[..]).unwrap(), value);
    }

    #[test]
    fn varint_i64_within_ten_bytes(value in any::<i64>()) {
        let mut out = Vec::new();
        varint::write_i64(value, &mut out).unwrap();
        prop_assert!(out.len() <= varint::MAX_LEN_64);
        prop_assert_eq!(varint::read_i64(&mut &out[..]).unwrap(), value);
    }

    #[test]
    fn small_magnitudes_stay_short(value in -64i32..64) {
        let mut out = Vec::new();
        varint::write_i32(value, &mut out).unwrap();
        prop_assert_eq!(out.len(), 1);
    }
}

const MAX_PROPTEST_PAYLOAD_SIZE: usize = 2048;

fn filter_pool() -> Vec<Filter> {
    vec![
        #[cfg(feature = "deflate")]
        Filter::deflate(),
        #[cfg(feature = "deflate")]
        Filter::gzip(),
        #[cfg(feature = "lz4")]
        Filter::lz4(),
        #[cfg(feature = "base64")]
        Filter::base64(),
        #[cfg(feature = "base64")]
        Filter::base64_url(),
        #[cfg(feature = "base64")]
        Filter::base64_mime(),
        #[cfg(feature = "aes")]
        Filter::aes(&[0x5A; 16]).unwrap(),
        Filter::identity(),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn raw_bytes_through_any_chain(
        ref values in proptest::collection::vec(
            proptest::collection::vec(any::<u8>(), 0..MAX_PROPTEST_PAYLOAD_SIZE),
            0..8,
        ),
        ref picks in proptest::collection::vec(any::<prop::sample::Index>(), 0..4),
        buffered in any::<bool>(),
    ) {
        let pool = filter_pool();
        let chain = Filter::chain_all(picks.iter().map(|i| pool[i.index(pool.len())].clone()));
        let buffer = if buffered {
            // Force buffering even over in-memory streams.
            BufferSpec::with_sizes(37, 53)
                .with_input_exclusions(Vec::<StreamType>::new())
                .unwrap()
                .with_output_exclusions(Vec::<StreamType>::new())
                .unwrap()
        } else {
            BufferSpec::none()
        };
        let codec = Codec::builder(RawBytes).filter(chain).buffer(buffer).build();

        let mut out = Vec::new();
        {
            let mut writer = codec.wrap_writer(&mut out).unwrap();
            for value in values {
                writer.write(value).unwrap();
            }
            writer.close().unwrap();
        }

        let mut reader = codec.wrap_reader(&out[..]).unwrap();
        let back: Vec<Vec<u8>> = reader.values().collect::<Result<_>>().unwrap();
        prop_assert_eq!(&back, values);
    }

    #[test]
    fn text_in_unicode_encodings(ref text in "\\PC{0,200}") {
        for encoding in [TextEncoding::Utf8, TextEncoding::Utf16Be, TextEncoding::Utf16Le] {
            let codec = Codec::builder(Text::new(encoding)).build();
            let bytes = codec.encode(text).unwrap();
            prop_assert_eq!(&codec.decode(&bytes).unwrap(), text);
        }
    }

    #[test]
    fn text_in_single_byte_encodings(ref text in "[ -~]{0,200}") {
        for encoding in [TextEncoding::Ascii, TextEncoding::Latin1] {
            let codec = Codec::builder(Text::new(encoding)).build();
            let bytes = codec.encode(text).unwrap();
            prop_assert_eq!(bytes.len(), text.len() + varint::encoded_len(text.len() as u64));
            prop_assert_eq!(&codec.decode(&bytes).unwrap(), text);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Record {
    flag: bool,
    small: i16,
    count: i32,
    total: i64,
    ratio: f64,
    name: String,
    samples: Vec<i32>,
    tags: BTreeMap<String, i64>,
    id: u128,
    when: chrono::NaiveDateTime,
}

fn record_encoder() -> StateEncoder<Record> {
    StateEncoder::new(
        |w, r: &Record| {
            w.put_bool(r.flag)?
                .put_i16(r.small)?
                .put_var_i32(r.count)?
                .put_i64(r.total)?
                .put_f64(r.ratio)?
                .put_str(&r.name)?
                .put_i32s(&r.samples)?
                .put_map(&r.tags, |w, k| w.put_str(k), |w, v| w.put_var_i64(*v))?
                .put_uuid(&uuid::Uuid::from_u128(r.id))?
                .put_datetime(&r.when)
        },
        |r| {
            Ok(Record {
                flag: r.get_bool()?,
                small: r.get_i16()?,
                count: r.get_var_i32()?,
                total: r.get_i64()?,
                ratio: r.get_f64()?,
                name: r.get_string()?,
                samples: r.get_i32s()?,
                tags: r.get_map(|r| r.get_string(), |r| r.get_var_i64())?,
                id: r.get_uuid()?.as_u128(),
                when: r.get_datetime()?,
            })
        },
    )
}

fn arb_record() -> impl Strategy<Value = Record> {
    (
        (any::<bool>(), any::<i16>(), any::<i32>(), any::<i64>()),
        (-1.0e12f64..1.0e12, "\\PC{0,40}"),
        proptest::collection::vec(any::<i32>(), 0..32),
        proptest::collection::btree_map("[a-z]{1,8}", any::<i64>(), 0..8),
        any::<u128>(),
        (-30_000_000_000i64..30_000_000_000, 0u32..1_000_000_000),
    )
        .prop_map(|((flag, small, count, total), (ratio, name), samples, tags, id, (secs, nanos))| {
            let when = chrono::DateTime::<chrono::Utc>::from_timestamp(secs, nanos)
                .unwrap()
                .naive_utc();
            Record { flag, small, count, total, ratio, name, samples, tags, id, when }
        })
}

proptest! {
    #[test]
    fn state_records_round_trip(ref records in proptest::collection::vec(arb_record(), 1..6)) {
        let codec = Codec::builder(record_encoder()).build();
        let mut out = Vec::new();
        {
            let mut writer = codec.wrap_writer(&mut out).unwrap();
            for record in records {
                writer.write(record).unwrap();
            }
            writer.close().unwrap();
        }
        let mut reader = codec.wrap_reader(&out[..]).unwrap();
        for record in records {
            prop_assert_eq!(&reader.read().unwrap(), record);
        }
        prop_assert!(reader.try_read().unwrap().is_none());
    }

    #[test]
    fn state_reader_reports_eof_after_last_field(values in proptest::collection::vec(any::<i64>(), 0..16)) {
        let mut out = Vec::new();
        values
            .iter()
            .try_fold(StateWriter::new(&mut out), |w, v| w.put_var_i64(*v))
            .unwrap();
        let mut input = &out[..];
        let mut reader = StateReader::new(&mut input);
        for value in &values {
            prop_assert!(!reader.is_eof().unwrap());
            prop_assert_eq!(reader.get_var_i64().unwrap(), *value);
        }
        prop_assert!(reader.is_eof().unwrap());
        prop_assert!(reader.get_var_i64().unwrap_err().is_eof());
    }
}
