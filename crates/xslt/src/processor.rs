use crate::config::ExecutionConfig;
use crate::context::{Context, Value};
use crate::error::XsltError;
use crate::interpreter;
use std::collections::HashMap;
use weft_dom::{Document, SerializeOptions, XmlNode, xml_text};
use weft_xpath1::FunctionRegistry;

/// Runs a loaded stylesheet against source trees.
///
/// Parameters are bound in the outermost scope of every transform, so a
/// top-level `xsl:param` with the same name keeps the caller's value.
pub struct XsltProcessor<'d> {
    stylesheet: Option<XmlNode<'d>>,
    parameters: HashMap<String, Value<'d>>,
    functions: FunctionRegistry,
    config: ExecutionConfig,
}

impl Default for XsltProcessor<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'d> XsltProcessor<'d> {
    pub fn new() -> Self {
        Self::with_config(ExecutionConfig::default())
    }

    pub fn with_config(config: ExecutionConfig) -> Self {
        XsltProcessor {
            stylesheet: None,
            parameters: HashMap::new(),
            functions: FunctionRegistry::default(),
            config,
        }
    }

    /// Loads the stylesheet: either its document node or the stylesheet element.
    pub fn import_stylesheet(&mut self, stylesheet: XmlNode<'d>) {
        self.stylesheet = Some(stylesheet);
    }

    pub fn set_parameter(&mut self, name: impl Into<String>, value: Value<'d>) {
        self.parameters.insert(name.into(), value);
    }

    pub fn get_parameter(&self, name: &str) -> Option<&Value<'d>> {
        self.parameters.get(name)
    }

    pub fn remove_parameter(&mut self, name: &str) -> Option<Value<'d>> {
        self.parameters.remove(name)
    }

    pub fn clear_parameters(&mut self) {
        self.parameters.clear();
    }

    /// Drops the stylesheet and all parameters.
    pub fn reset(&mut self) {
        self.stylesheet = None;
        self.parameters.clear();
    }

    /// Transforms `source` into a new fragment owned by `output`. The source
    /// node is also the anchor for absolute paths.
    pub fn transform_to_fragment<'o>(
        &self,
        source: XmlNode<'o>,
        output: &'o Document,
    ) -> Result<XmlNode<'o>, XsltError>
    where
        'd: 'o,
    {
        let stylesheet = self.stylesheet.ok_or(XsltError::NoStylesheet)?;
        let fragment = output.create_fragment();
        let mut ctx = Context::new(source, &self.functions)
            .with_variables(self.parameters.clone())
            .with_strict(self.config.strict);

        log::debug!(
            "Transforming {:?} with {:?} ({} parameters)",
            source,
            stylesheet,
            self.parameters.len()
        );
        interpreter::process(&mut ctx, stylesheet, fragment)?;
        log::debug!("Transform produced {} top-level nodes", fragment.children().len());
        Ok(fragment)
    }

    /// Transforms `source` into a fresh document.
    pub fn transform_to_document(&self, source: XmlNode<'_>) -> Result<Document, XsltError> {
        let output = Document::new();
        let fragment = self.transform_to_fragment(source, &output)?;
        output.root().append_child(fragment)?;
        Ok(output)
    }
}

/// Transforms `source` with `stylesheet` and serializes the result.
pub fn xslt_process(source: XmlNode<'_>, stylesheet: XmlNode<'_>) -> Result<String, XsltError> {
    let mut processor = XsltProcessor::new();
    processor.import_stylesheet(stylesheet);
    let output = Document::new();
    let fragment = processor.transform_to_fragment(source, &output)?;
    Ok(xml_text(fragment, &SerializeOptions::default()))
}
