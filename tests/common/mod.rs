#![allow(dead_code)]

use weft::{Error, ExecutionConfig, transform_str_with};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub const XSL_NAMESPACE: &str = "http://www.w3.org/1999/XSL/Transform";

/// Three items whose document order, `pos` order and text order all differ.
pub const ITEMS_XML: &str =
    r#"<all><item pos="2">A</item><item pos="3">B</item><item pos="1">C</item></all>"#;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Wraps top-level stylesheet content in an `xsl:stylesheet` element.
pub fn stylesheet(body: &str) -> String {
    format!(
        r#"<xsl:stylesheet version="1.0" xmlns:xsl="{}">{}</xsl:stylesheet>"#,
        XSL_NAMESPACE, body
    )
}

/// Transforms `xml` with a stylesheet built from `body`.
pub fn run(xml: &str, body: &str) -> Result<String, Error> {
    run_with(xml, body, ExecutionConfig::default())
}

pub fn run_with(xml: &str, body: &str, config: ExecutionConfig) -> Result<String, Error> {
    init_logger();
    transform_str_with(xml, &stylesheet(body), config)
}
