mod common;

use common::{ITEMS_XML, TestResult, run, run_with};
use weft::xpath::XPathError;
use weft::{Error, ExecutionConfig, XsltError};

#[test]
fn test_malformed_source_is_a_parse_error() {
    let err = run("<all><item></all>", r#"<xsl:template match="/"/>"#).unwrap_err();
    assert!(matches!(err, Error::Parse(_)), "unexpected error: {err}");
}

#[test]
fn test_unescaped_ampersand_is_rejected() {
    let err = run("<x>Fish&pie</x>", r#"<xsl:template match="/"/>"#).unwrap_err();
    assert!(matches!(err, Error::Parse(_)));
}

#[test]
fn test_unknown_named_template() {
    let err = run(
        ITEMS_XML,
        r#"<xsl:template match="/"><xsl:call-template name="nope"/></xsl:template>"#,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        Error::Transform(XsltError::UnknownTemplate(ref name)) if name == "nope"
    ));
}

#[test]
fn test_attribute_outside_an_element() {
    let err = run(
        ITEMS_XML,
        r#"<xsl:template match="/"><xsl:attribute name="a">v</xsl:attribute></xsl:template>"#,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        Error::Transform(XsltError::NotAnElement { ref name, .. }) if name == "a"
    ));
}

#[test]
fn test_unsupported_sort_type() {
    let err = run(
        ITEMS_XML,
        r#"<xsl:template match="/"><xsl:for-each select="//item"><xsl:sort select="." data-type="qname"/></xsl:for-each></xsl:template>"#,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        Error::Transform(XsltError::UnsupportedSortType(ref t)) if t == "qname"
    ));
}

#[test]
fn test_unimplemented_instruction() {
    let err = run(
        ITEMS_XML,
        r#"<xsl:template match="/"><xsl:number/></xsl:template>"#,
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "Transform failed: Not implemented: xsl:number");
}

#[test]
fn test_for_each_requires_a_node_set() {
    let err = run(
        ITEMS_XML,
        r#"<xsl:template match="/"><xsl:for-each select="'text'"/></xsl:template>"#,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        Error::Transform(XsltError::XPath(XPathError::TypeError(_)))
    ));
}

#[test]
fn test_bad_xpath_syntax() {
    let err = run(
        ITEMS_XML,
        r#"<xsl:template match="/"><xsl:value-of select="1 +"/></xsl:template>"#,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        Error::Transform(XsltError::XPath(XPathError::XPathParse(..)))
    ));
}

#[test]
fn test_bad_with_param_fails_on_empty_selection() {
    let err = run(
        ITEMS_XML,
        r#"<xsl:template match="/"><xsl:apply-templates select="//missing"><xsl:with-param name="p" select="1 +"/></xsl:apply-templates></xsl:template>"#,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        Error::Transform(XsltError::XPath(XPathError::XPathParse(..)))
    ));
}

#[test]
fn test_unbound_variable_depends_on_strictness() -> TestResult {
    let body = r#"<xsl:template match="/">[<xsl:value-of select="$missing"/>]</xsl:template>"#;
    assert_eq!(run(ITEMS_XML, body)?, "[]");

    let err = run_with(ITEMS_XML, body, ExecutionConfig { strict: true }).unwrap_err();
    assert!(matches!(
        err,
        Error::Transform(XsltError::XPath(XPathError::UnknownVariable(ref v))) if v == "missing"
    ));
    Ok(())
}
