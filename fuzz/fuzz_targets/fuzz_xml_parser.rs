#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Decoder stack on a bare model document, strict and lenient
    let Ok(xml) = std::str::from_utf8(data) else {
        return;
    };
    let _ = lib3mf_stream::parser::parse_model_xml(xml);
    let lenient = lib3mf_stream::ParserConfig::lenient().with_validation(false);
    let _ = lib3mf_stream::parser::parse_model_xml_with_config(xml, &lenient);
});
