use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use roxmltree::{Document, Node};

use crate::key::{KeyQuantizer, ObjectKey};
use crate::world::Vec2;

use super::hashing::catalog_digest_hex;
use super::{CatalogError, CatalogErrorCode, CuratedCatalog, SourceLocation};

struct ParseContext<'a, 'input> {
    file_path: &'a Path,
    doc: &'a Document<'input>,
    quantizer: &'a KeyQuantizer,
}

/// Parses a `<GrassCatalog>` document:
///
/// ```xml
/// <GrassCatalog version="3">
///   <Region id="Crossroads_01">
///     <Grass x="12.3" y="4.5" index="0"/>
///   </Region>
///   <Alias>
///     <Key region="Crossroads_01" x="12.3" y="4.5"/>
///     <Key region="Crossroads_01b" x="12.3" y="4.5"/>
///   </Alias>
/// </GrassCatalog>
/// ```
pub fn parse_catalog(
    raw: &str,
    file_path: &Path,
    quantizer: &KeyQuantizer,
) -> Result<CuratedCatalog, CatalogError> {
    let doc = Document::parse(raw).map_err(|error| CatalogError {
        code: CatalogErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;
    let ctx = ParseContext {
        file_path,
        doc: &doc,
        quantizer,
    };

    let root = doc.root_element();
    if root.tag_name().name() != "GrassCatalog" {
        return Err(ctx.error_at(
            CatalogErrorCode::InvalidRoot,
            "root element must be <GrassCatalog>".to_string(),
            root,
        ));
    }
    let version = ctx.parse_attr::<u32>(root, "version")?;

    let mut keys_by_region = BTreeMap::<String, Vec<ObjectKey>>::new();
    let mut seen = HashMap::<ObjectKey, SourceLocation>::new();
    let mut aliases = Vec::<(ObjectKey, ObjectKey)>::new();

    for child in root.children().filter(|node| node.is_element()) {
        match child.tag_name().name() {
            "Region" => {
                let region = ctx.required_attr(child, "id")?;
                let keys = keys_by_region.entry(region.to_string()).or_default();
                for grass in child.children().filter(|node| node.is_element()) {
                    if grass.tag_name().name() != "Grass" {
                        return Err(ctx.error_at(
                            CatalogErrorCode::UnknownElement,
                            format!(
                                "unsupported element <{}> in <Region>; expected <Grass>",
                                grass.tag_name().name()
                            ),
                            grass,
                        ));
                    }
                    let key = ctx.parse_key(grass, region)?;
                    if let Some(first) = seen.insert(key.clone(), ctx.location(grass)) {
                        return Err(ctx.error_at(
                            CatalogErrorCode::DuplicateKey,
                            format!(
                                "duplicate grass key {key} (first declared at line {})",
                                first.line
                            ),
                            grass,
                        ));
                    }
                    keys.push(key);
                }
            }
            "Alias" => aliases.push(ctx.parse_alias(child)?),
            other => {
                return Err(ctx.error_at(
                    CatalogErrorCode::UnknownElement,
                    format!("unsupported element <{other}>; expected <Region> or <Alias>"),
                    child,
                ))
            }
        }
    }

    Ok(CuratedCatalog::new(
        version,
        catalog_digest_hex(raw),
        keys_by_region,
        aliases,
    ))
}

impl<'a, 'input> ParseContext<'a, 'input> {
    fn parse_alias(&self, node: Node<'_, '_>) -> Result<(ObjectKey, ObjectKey), CatalogError> {
        let mut keys = Vec::<ObjectKey>::with_capacity(2);
        for child in node.children().filter(|node| node.is_element()) {
            if child.tag_name().name() != "Key" {
                return Err(self.error_at(
                    CatalogErrorCode::UnknownElement,
                    format!(
                        "unsupported element <{}> in <Alias>; expected <Key>",
                        child.tag_name().name()
                    ),
                    child,
                ));
            }
            let region = self.required_attr(child, "region")?;
            keys.push(self.parse_key(child, region)?);
        }
        let mut keys = keys.into_iter();
        match (keys.next(), keys.next(), keys.next()) {
            (Some(a), Some(b), None) => Ok((a, b)),
            _ => Err(self.error_at(
                CatalogErrorCode::InvalidValue,
                "<Alias> must contain exactly two <Key> elements".to_string(),
                node,
            )),
        }
    }

    fn parse_key(&self, node: Node<'_, '_>, region: &str) -> Result<ObjectKey, CatalogError> {
        let x = self.parse_coordinate(node, "x")?;
        let y = self.parse_coordinate(node, "y")?;
        let index = match node.attribute("index") {
            Some(_) => self.parse_attr::<u32>(node, "index")?,
            None => 0,
        };
        let (qx, qy) = self.quantizer.quantize(Vec2 { x, y }).ok_or_else(|| {
            self.error_at(
                CatalogErrorCode::InvalidValue,
                format!("position ({x}, {y}) does not fit the key grid"),
                node,
            )
        })?;
        Ok(ObjectKey::new(region, qx, qy, index))
    }

    fn parse_coordinate(&self, node: Node<'_, '_>, name: &str) -> Result<f32, CatalogError> {
        let value = self.parse_attr::<f32>(node, name)?;
        if !value.is_finite() {
            return Err(self.error_at(
                CatalogErrorCode::InvalidValue,
                format!("attribute '{name}' must be finite"),
                node,
            ));
        }
        Ok(value)
    }

    fn parse_attr<T: std::str::FromStr>(
        &self,
        node: Node<'_, '_>,
        name: &str,
    ) -> Result<T, CatalogError> {
        let raw = self.required_attr(node, name)?;
        raw.parse::<T>().map_err(|_| {
            self.error_at(
                CatalogErrorCode::InvalidValue,
                format!("attribute '{name}' has invalid value '{raw}'"),
                node,
            )
        })
    }

    fn required_attr<'n>(&self, node: Node<'n, '_>, name: &str) -> Result<&'n str, CatalogError> {
        match node.attribute(name).map(str::trim) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(self.error_at(
                CatalogErrorCode::MissingAttribute,
                format!(
                    "missing required attribute '{name}' on <{}>",
                    node.tag_name().name()
                ),
                node,
            )),
        }
    }

    fn location(&self, node: Node<'_, '_>) -> SourceLocation {
        let pos = self.doc.text_pos_at(node.range().start);
        SourceLocation {
            line: pos.row as usize,
            column: pos.col as usize,
        }
    }

    fn error_at(
        &self,
        code: CatalogErrorCode,
        message: String,
        node: Node<'_, '_>,
    ) -> CatalogError {
        CatalogError {
            code,
            message,
            file_path: self.file_path.to_path_buf(),
            location: Some(self.location(node)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Result<CuratedCatalog, CatalogError> {
        parse_catalog(raw, Path::new("grass.xml"), &KeyQuantizer::default())
    }

    #[test]
    fn parses_regions_grass_and_aliases() {
        let catalog = parse(
            r#"<GrassCatalog version="3">
                <Region id="Glade">
                    <Grass x="1.0" y="2.0"/>
                    <Grass x="1.0" y="2.0" index="1"/>
                    <Grass x="-4.5" y="0.25"/>
                </Region>
                <Region id="Cave">
                    <Grass x="0" y="0"/>
                </Region>
                <Alias>
                    <Key region="Glade" x="-4.5" y="0.25"/>
                    <Key region="GladeOld" x="-4.5" y="0.25" index="2"/>
                </Alias>
            </GrassCatalog>"#,
        )
        .expect("parse");

        assert_eq!(catalog.version(), 3);
        assert_eq!(catalog.key_count(), 4);
        assert_eq!(catalog.regions().collect::<Vec<_>>(), vec!["Cave", "Glade"]);
        assert_eq!(
            catalog.keys_in_region("Glade"),
            &[
                ObjectKey::new("Glade", -45, 3, 0),
                ObjectKey::new("Glade", 10, 20, 0),
                ObjectKey::new("Glade", 10, 20, 1),
            ]
        );
        assert_eq!(
            catalog.aliases(),
            &[(
                ObjectKey::new("Glade", -45, 3, 0),
                ObjectKey::new("GladeOld", -45, 3, 2),
            )]
        );
        assert!(catalog.keys_in_region("Mines").is_empty());
    }

    #[test]
    fn rejects_wrong_root_and_malformed_xml() {
        let err = parse("<Defs/>").expect_err("wrong root");
        assert_eq!(err.code, CatalogErrorCode::InvalidRoot);

        let err = parse("<GrassCatalog version=\"1\">").expect_err("malformed");
        assert_eq!(err.code, CatalogErrorCode::XmlMalformed);
        assert!(err.location.is_some());
    }

    #[test]
    fn rejects_missing_and_invalid_attributes() {
        let err = parse("<GrassCatalog/>").expect_err("missing version");
        assert_eq!(err.code, CatalogErrorCode::MissingAttribute);

        let err = parse(r#"<GrassCatalog version="1"><Region><Grass x="1" y="1"/></Region></GrassCatalog>"#)
            .expect_err("missing region id");
        assert_eq!(err.code, CatalogErrorCode::MissingAttribute);

        let err = parse(
            r#"<GrassCatalog version="1"><Region id="A"><Grass x="one" y="1"/></Region></GrassCatalog>"#,
        )
        .expect_err("bad coordinate");
        assert_eq!(err.code, CatalogErrorCode::InvalidValue);

        let err = parse(
            r#"<GrassCatalog version="1"><Region id="A"><Grass x="inf" y="1"/></Region></GrassCatalog>"#,
        )
        .expect_err("infinite coordinate");
        assert_eq!(err.code, CatalogErrorCode::InvalidValue);
    }

    #[test]
    fn rejects_unknown_elements_and_bad_aliases() {
        let err = parse(r#"<GrassCatalog version="1"><Rock/></GrassCatalog>"#)
            .expect_err("unknown element");
        assert_eq!(err.code, CatalogErrorCode::UnknownElement);

        let err = parse(
            r#"<GrassCatalog version="1"><Alias><Key region="A" x="0" y="0"/></Alias></GrassCatalog>"#,
        )
        .expect_err("single key alias");
        assert_eq!(err.code, CatalogErrorCode::InvalidValue);
    }

    #[test]
    fn rejects_duplicate_keys_with_location() {
        let err = parse(
            "<GrassCatalog version=\"1\">\n<Region id=\"A\">\n<Grass x=\"1\" y=\"1\"/>\n<Grass x=\"1.01\" y=\"1\"/>\n</Region>\n</GrassCatalog>",
        )
        .expect_err("duplicate");
        assert_eq!(err.code, CatalogErrorCode::DuplicateKey);
        assert_eq!(err.location.map(|loc| loc.line), Some(4));
        assert!(err.message.contains("line 3"));
    }
}
