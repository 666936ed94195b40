#![no_main]
use libfuzzer_sys::fuzz_target;
use streamcodec::{Codec, Filter, RawBytes, StateEncoder, Text};

fuzz_target!(|data: &[u8]| {
    let raw = Codec::builder(RawBytes).build();
    if let Ok(mut reader) = raw.wrap_reader(data) {
        let _ = reader.process_all(|_| Ok(()));
    }

    let text = Codec::builder(Text::utf8())
        .filter(Filter::deflate())
        .filter(Filter::base64())
        .build();
    if let Ok(mut reader) = text.wrap_reader(data) {
        let _ = reader.process_all(|_| Ok(()));
    }

    let records = Codec::builder(StateEncoder::new(
        |w, v: &(Vec<i32>, String)| w.put_i32s(&v.0)?.put_str(&v.1),
        |r| Ok((r.get_i32s()?, r.get_string()?)),
    ))
    .filter(Filter::aes(&[0u8; 16]).unwrap())
    .build();
    if let Ok(mut reader) = records.wrap_reader(data) {
        let _ = reader.process_all(|_| Ok(()));
    }
});
