#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    // ZIP extraction -> part discovery -> parallel decode -> merge
    let cursor = Cursor::new(data);
    let config = lib3mf_stream::ParserConfig::lenient();
    if let Ok(model) = lib3mf_stream::Model::from_reader_with_config(cursor, config) {
        let _ = model.flatten();
    }
});
