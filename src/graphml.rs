// NetCarve: Network Emulation Setup written in Rust
// Copyright (C) 2022-2023 Tibor Schneider <sctibor@ethz.ch>
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! Streaming parser for [GraphML](http://graphml.graphdrawing.org/) topology files.
//!
//! The parser runs a small state machine over the XML token stream and emits one callback per
//! completed `<node>` or `<edge>` element, so arbitrarily large topologies can be read from a file
//! or from stdin without materializing a DOM. `<key>` declarations are tracked in a registry so
//! that `<data>` values can be interpreted under their declared types. Unrecognized elements and
//! attributes are skipped.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;
use xml::attribute::OwnedAttribute;
use xml::name::OwnedName;
use xml::reader::{ParserConfig, XmlEvent};

/// The XML namespace of GraphML documents.
pub const GRAPHML_NS: &str = "http://graphml.graphdrawing.org/xmlns";

/// A `<node>` element with its recognized data attributes applied.
#[derive(Debug, Clone, PartialEq)]
pub struct GmlNode {
    /// External identifier of the node, unique within the file.
    pub name: String,
    /// Whether the node is a client host. Defaults to `true` when no client discriminator is
    /// configured, and to `false` otherwise until a `type` attribute matches the discriminator.
    pub client: bool,
    /// Fraction of packets lost by the host, in [0, 1].
    pub packet_loss: f64,
    /// Upstream bandwidth in kb/s. Zero means unshaped.
    pub bandwidth_up: f64,
    /// Downstream bandwidth in kb/s. Zero means unshaped.
    pub bandwidth_down: f64,
}

/// An `<edge>` element with its recognized data attributes applied.
#[derive(Debug, Clone, PartialEq)]
pub struct GmlLink {
    /// External identifier of the source node.
    pub source: String,
    /// External identifier of the target node.
    pub target: String,
    /// Routing weight of the link (the value of the configured weight attribute).
    pub weight: f64,
    /// One-way latency in milliseconds.
    pub latency: f64,
    /// Fraction of packets lost on the link, in [0, 1].
    pub packet_loss: f64,
    /// Latency jitter in milliseconds.
    pub jitter: f64,
    /// Queue length in packets. Zero means the backend default.
    pub queue_len: u32,
}

/// Callbacks invoked by the parser, in document order. The handler decides how node and link
/// records are turned into network state; returning an error aborts the parse.
pub trait GmlHandler {
    /// Error type produced by the callbacks.
    type Error: std::error::Error;

    /// Called for every completed `<node>` element.
    fn add_node(&mut self, node: &GmlNode) -> Result<(), Self::Error>;

    /// Called for every completed `<edge>` element.
    fn add_link(&mut self, link: &GmlLink) -> Result<(), Self::Error>;
}

/// Declared type of a GraphML attribute key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrType {
    /// An integer number (`int` or `long`).
    Int,
    /// A floating-point number (`float` or `double`).
    Float,
    /// A string.
    String,
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrType::Int => f.write_str("int"),
            AttrType::Float => f.write_str("float"),
            AttrType::String => f.write_str("string"),
        }
    }
}

fn parse_attr_type(s: &str) -> Option<AttrType> {
    match s {
        "int" | "long" => Some(AttrType::Int),
        "float" | "double" => Some(AttrType::Float),
        "string" => Some(AttrType::String),
        _ => None,
    }
}

/// Errors from the GraphML parser itself.
#[derive(Debug, Error)]
pub enum GraphMlError {
    /// The underlying XML stream is malformed.
    #[error("Cannot parse the XML: {0}")]
    Xml(#[from] xml::reader::Error),
    /// The topology file could not be opened or read.
    #[error("Cannot read topology file '{0}': {1}")]
    Io(PathBuf, std::io::Error),
    /// The root element is not `<graphml>`.
    #[error("The topology file is not a GraphML file (root element is <{0}>).")]
    NotGraphMl(String),
    /// The root element uses a namespace other than [`GRAPHML_NS`].
    #[error("The topology file uses an unknown GraphML namespace: {0}")]
    WrongNamespace(String),
    /// A required attribute is missing from an element.
    #[error("The topology contains a <{0}> element without a '{1}' attribute.")]
    MissingAttribute(&'static str, &'static str),
    /// A recognized key is declared with an incompatible `attr.type`.
    #[error("The key '{0}' in the topology file has unexpected type '{1}'.")]
    KeyType(String, String),
    /// A data value does not parse under the declared type.
    #[error("Cannot parse value '{0}' as {1}.")]
    ValueParse(String, AttrType),
    /// A directed edge was encountered; only undirected topologies are supported.
    #[error("The topology contains a directed edge from '{0}' to '{1}'. Only undirected edges are supported.")]
    DirectedEdge(String, String),
}

/// Either a parse failure or an error returned by the handler callbacks.
#[derive(Debug, Error)]
pub enum GmlError<E: std::error::Error> {
    /// The document could not be parsed.
    #[error(transparent)]
    Parse(#[from] GraphMlError),
    /// A handler callback failed.
    #[error(transparent)]
    Handler(E),
}

/// Recognized typed attributes on nodes and edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyKind {
    NodeType,
    NodePacketLoss,
    NodeBandwidthUp,
    NodeBandwidthDown,
    EdgeLatency,
    EdgePacketLoss,
    EdgeJitter,
    EdgeQueueLen,
}

/// Registry entry for a `<key>` declaration. A single edge key can be both a recognized attribute
/// and the configured weight attribute.
#[derive(Debug, Clone, Copy)]
struct RegisteredKey {
    kind: Option<KeyKind>,
    weight: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Inside an unrecognized element.
    Unknown,
    /// Waiting for the `<graphml>` root.
    Initial,
    /// Waiting for `<key>` declarations or the `<graph>`.
    TopLevel,
    /// Inside the `<graph>` element.
    Graph,
    /// Inside a `<node>` element.
    Node,
    /// Inside an `<edge>` element.
    Edge,
    /// Inside a `<data>` element.
    Data,
}

struct ParserState<'a> {
    mode: Mode,
    /// Value of a node's `type` attribute that marks it as a client.
    client_type: Option<&'a str>,
    /// Name of the edge attribute used as the routing weight.
    weight_key: &'a str,

    /// Element depth below the first unknown element, and the mode to restore.
    unknown_depth: u32,
    unknown_mode: Mode,

    /// Whether edges are undirected unless they say otherwise.
    default_undirected: bool,

    /// Key registry: `<data>` references declarations by id.
    keys: HashMap<String, RegisteredKey>,

    /// Key id and accumulated character data of the `<data>` element being read.
    data_key: String,
    data_value: String,
    /// Mode to return to once the `<data>` element closes.
    data_mode: Mode,

    /// Records handed to the callbacks, reused across elements.
    node: GmlNode,
    link: GmlLink,
}

fn find_attr<'a>(attrs: &'a [OwnedAttribute], name: &str) -> Option<&'a str> {
    attrs.iter().find(|a| a.name.local_name == name).map(|a| a.value.as_str())
}

fn parse_num(value: &str) -> Result<f64, GraphMlError> {
    value
        .trim()
        .parse()
        .map_err(|_| GraphMlError::ValueParse(value.trim().to_string(), AttrType::Float))
}

impl<'a> ParserState<'a> {
    fn new(client_type: Option<&'a str>, weight_key: &'a str) -> Self {
        Self {
            mode: Mode::Initial,
            client_type,
            weight_key,
            unknown_depth: 0,
            unknown_mode: Mode::Unknown,
            default_undirected: false,
            keys: HashMap::new(),
            data_key: String::new(),
            data_value: String::new(),
            data_mode: Mode::Unknown,
            node: GmlNode {
                name: String::new(),
                client: false,
                packet_loss: 0.0,
                bandwidth_up: 0.0,
                bandwidth_down: 0.0,
            },
            link: GmlLink {
                source: String::new(),
                target: String::new(),
                weight: 0.0,
                latency: 0.0,
                packet_loss: 0.0,
                jitter: 0.0,
                queue_len: 0,
            },
        }
    }

    fn register_key(&mut self, attrs: &[OwnedAttribute]) -> Result<(), GraphMlError> {
        let mut name = None;
        let mut id = None;
        let mut ty = None;
        let mut key_for = None;
        for attr in attrs {
            match attr.name.local_name.as_str() {
                "attr.name" => name = Some(attr.value.as_str()),
                "attr.type" => ty = Some(attr.value.as_str()),
                "id" => id = Some(attr.value.as_str()),
                "for" => key_for = Some(attr.value.as_str()),
                _ => {}
            }
        }
        let (Some(name), Some(id), Some(ty), Some(key_for)) = (name, id, ty, key_for) else {
            // Incomplete declarations cannot be referenced in a meaningful way.
            return Ok(());
        };

        let kind = match key_for {
            "node" => match name {
                "type" => Some(KeyKind::NodeType),
                "packetloss" => Some(KeyKind::NodePacketLoss),
                "bandwidthup" => Some(KeyKind::NodeBandwidthUp),
                "bandwidthdown" => Some(KeyKind::NodeBandwidthDown),
                _ => None,
            },
            "edge" => match name {
                "latency" => Some(KeyKind::EdgeLatency),
                "packetloss" => Some(KeyKind::EdgePacketLoss),
                "jitter" => Some(KeyKind::EdgeJitter),
                "queue_len" => Some(KeyKind::EdgeQueueLen),
                _ => None,
            },
            _ => None,
        };
        let weight = key_for == "edge" && name == self.weight_key;
        if kind.is_none() && !weight {
            return Ok(());
        }

        let type_ok = match parse_attr_type(ty) {
            Some(t) => {
                let kind_ok = match kind {
                    Some(KeyKind::NodeType) => t == AttrType::String,
                    Some(KeyKind::EdgeQueueLen) => t == AttrType::Int,
                    Some(_) => matches!(t, AttrType::Int | AttrType::Float),
                    None => true,
                };
                kind_ok && (!weight || matches!(t, AttrType::Int | AttrType::Float))
            }
            None => false,
        };
        if !type_ok {
            return Err(GraphMlError::KeyType(name.to_string(), ty.to_string()));
        }

        self.keys.insert(id.to_string(), RegisteredKey { kind, weight });
        Ok(())
    }

    fn start_element(
        &mut self,
        name: &OwnedName,
        attrs: &[OwnedAttribute],
    ) -> Result<(), GraphMlError> {
        let mut unknown = false;

        match self.mode {
            Mode::Unknown => self.unknown_depth += 1,

            Mode::Initial => {
                if name.local_name != "graphml" {
                    return Err(GraphMlError::NotGraphMl(name.local_name.clone()));
                }
                if let Some(ns) = name.namespace.as_deref() {
                    if ns != GRAPHML_NS {
                        return Err(GraphMlError::WrongNamespace(ns.to_string()));
                    }
                }
                self.mode = Mode::TopLevel;
            }

            Mode::TopLevel => {
                if name.local_name == "key" {
                    self.register_key(attrs)?;
                    // Skip over possible <default> children.
                    unknown = true;
                } else if name.local_name == "graph" {
                    self.default_undirected = find_attr(attrs, "edgedefault") == Some("undirected");
                    self.mode = Mode::Graph;
                } else {
                    unknown = true;
                }
            }

            Mode::Graph => {
                if name.local_name == "node" {
                    let id = find_attr(attrs, "id")
                        .ok_or(GraphMlError::MissingAttribute("node", "id"))?;
                    self.node = GmlNode {
                        name: id.to_string(),
                        client: self.client_type.is_none(),
                        packet_loss: 0.0,
                        bandwidth_up: 0.0,
                        bandwidth_down: 0.0,
                    };
                    self.mode = Mode::Node;
                } else if name.local_name == "edge" {
                    let mut undirected = self.default_undirected;
                    if let Some(directed) = find_attr(attrs, "directed") {
                        undirected = directed == "false";
                    }
                    let source = find_attr(attrs, "source")
                        .ok_or(GraphMlError::MissingAttribute("edge", "source"))?;
                    let target = find_attr(attrs, "target")
                        .ok_or(GraphMlError::MissingAttribute("edge", "target"))?;
                    if !undirected {
                        return Err(GraphMlError::DirectedEdge(
                            source.to_string(),
                            target.to_string(),
                        ));
                    }
                    self.link = GmlLink {
                        source: source.to_string(),
                        target: target.to_string(),
                        weight: 0.0,
                        latency: 0.0,
                        packet_loss: 0.0,
                        jitter: 0.0,
                        queue_len: 0,
                    };
                    self.mode = Mode::Edge;
                } else {
                    unknown = true;
                }
            }

            Mode::Node | Mode::Edge => {
                if name.local_name == "data" {
                    let key = find_attr(attrs, "key")
                        .ok_or(GraphMlError::MissingAttribute("data", "key"))?;
                    self.data_key.clear();
                    self.data_key.push_str(key);
                    self.data_value.clear();
                    self.data_mode = self.mode;
                    self.mode = Mode::Data;
                } else {
                    unknown = true;
                }
            }

            Mode::Data => unknown = true,
        }

        if unknown {
            self.unknown_mode = self.mode;
            self.mode = Mode::Unknown;
            self.unknown_depth = 0;
        }
        Ok(())
    }

    fn end_element<H: GmlHandler>(&mut self, handler: &mut H) -> Result<(), GmlError<H::Error>> {
        match self.mode {
            Mode::Unknown => {
                if self.unknown_depth == 0 {
                    self.mode = self.unknown_mode;
                } else {
                    self.unknown_depth -= 1;
                }
            }
            Mode::Data => {
                self.apply_data()?;
                self.mode = self.data_mode;
            }
            Mode::Node => {
                handler.add_node(&self.node).map_err(GmlError::Handler)?;
                self.mode = Mode::Graph;
            }
            Mode::Edge => {
                handler.add_link(&self.link).map_err(GmlError::Handler)?;
                self.mode = Mode::Graph;
            }
            Mode::Graph => self.mode = Mode::TopLevel,
            Mode::TopLevel => {
                // The document root closed; anything that follows is not ours.
                self.mode = Mode::Unknown;
                self.unknown_depth = 0;
                self.unknown_mode = Mode::Unknown;
            }
            // The tokenizer guarantees balanced elements.
            Mode::Initial => {}
        }
        Ok(())
    }

    fn characters(&mut self, text: &str) {
        if self.mode == Mode::Data {
            self.data_value.push_str(text);
        }
    }

    /// Interpret the accumulated `<data>` value under the declared type of its key. Data bound to
    /// unknown keys, or to keys declared for the other element kind, is ignored.
    fn apply_data(&mut self) -> Result<(), GraphMlError> {
        let Some(key) = self.keys.get(self.data_key.as_str()).copied() else {
            return Ok(());
        };
        let value = self.data_value.as_str();

        match self.data_mode {
            Mode::Node => match key.kind {
                Some(KeyKind::NodeType) => {
                    if let Some(client_type) = self.client_type {
                        self.node.client = value.trim() == client_type;
                    }
                }
                Some(KeyKind::NodePacketLoss) => self.node.packet_loss = parse_num(value)?,
                Some(KeyKind::NodeBandwidthUp) => self.node.bandwidth_up = parse_num(value)?,
                Some(KeyKind::NodeBandwidthDown) => self.node.bandwidth_down = parse_num(value)?,
                _ => {}
            },
            Mode::Edge => {
                match key.kind {
                    Some(KeyKind::EdgeLatency) => self.link.latency = parse_num(value)?,
                    Some(KeyKind::EdgePacketLoss) => self.link.packet_loss = parse_num(value)?,
                    Some(KeyKind::EdgeJitter) => self.link.jitter = parse_num(value)?,
                    Some(KeyKind::EdgeQueueLen) => {
                        self.link.queue_len = value.trim().parse().map_err(|_| {
                            GraphMlError::ValueParse(value.trim().to_string(), AttrType::Int)
                        })?
                    }
                    _ => {}
                }
                if key.weight {
                    self.link.weight = parse_num(value)?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Parse a GraphML document from an arbitrary reader, invoking the handler callbacks in document
/// order. `client_type` is the value of a node's `type` attribute that marks it as a client (all
/// nodes are clients when `None`), and `weight_key` names the edge attribute used as the routing
/// weight.
pub fn parse<R, H>(
    input: R,
    handler: &mut H,
    client_type: Option<&str>,
    weight_key: &str,
) -> Result<(), GmlError<H::Error>>
where
    R: Read,
    H: GmlHandler,
{
    let mut state = ParserState::new(client_type, weight_key);
    let mut reader = ParserConfig::new()
        .cdata_to_characters(true)
        .whitespace_to_characters(true)
        .create_reader(input);

    loop {
        match reader.next().map_err(GraphMlError::from)? {
            XmlEvent::StartElement { name, attributes, .. } => {
                state.start_element(&name, &attributes)?
            }
            XmlEvent::EndElement { .. } => state.end_element(handler)?,
            XmlEvent::Characters(text) => state.characters(&text),
            XmlEvent::EndDocument => break,
            _ => {}
        }
    }
    Ok(())
}

/// Parse a GraphML file from disk. See [`parse`].
pub fn parse_file<H: GmlHandler>(
    path: &Path,
    handler: &mut H,
    client_type: Option<&str>,
    weight_key: &str,
) -> Result<(), GmlError<H::Error>> {
    let file = File::open(path).map_err(|e| GraphMlError::Io(path.to_path_buf(), e))?;
    parse(BufReader::new(file), handler, client_type, weight_key)
}

#[cfg(test)]
mod test {
    use std::convert::Infallible;

    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Debug, Default)]
    struct Collector {
        nodes: Vec<GmlNode>,
        links: Vec<GmlLink>,
    }

    impl GmlHandler for Collector {
        type Error = Infallible;

        fn add_node(&mut self, node: &GmlNode) -> Result<(), Infallible> {
            self.nodes.push(node.clone());
            Ok(())
        }

        fn add_link(&mut self, link: &GmlLink) -> Result<(), Infallible> {
            self.links.push(link.clone());
            Ok(())
        }
    }

    fn run(doc: &str, client_type: Option<&str>, weight_key: &str) -> Collector {
        let mut collector = Collector::default();
        parse(doc.as_bytes(), &mut collector, client_type, weight_key).unwrap();
        collector
    }

    fn run_err(doc: &str, client_type: Option<&str>, weight_key: &str) -> GraphMlError {
        let mut collector = Collector::default();
        match parse(doc.as_bytes(), &mut collector, client_type, weight_key) {
            Err(GmlError::Parse(e)) => e,
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    const FULL_DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<graphml xmlns="http://graphml.graphdrawing.org/xmlns">
  <key id="d0" for="node" attr.name="type" attr.type="string"/>
  <key id="d1" for="node" attr.name="packetloss" attr.type="double"/>
  <key id="d2" for="node" attr.name="bandwidthup" attr.type="long"/>
  <key id="d3" for="node" attr.name="bandwidthdown" attr.type="double"/>
  <key id="e0" for="edge" attr.name="latency" attr.type="double"/>
  <key id="e1" for="edge" attr.name="packetloss" attr.type="double"/>
  <key id="e2" for="edge" attr.name="jitter" attr.type="double"/>
  <key id="e3" for="edge" attr.name="queue_len" attr.type="int"/>
  <graph edgedefault="undirected">
    <node id="n0">
      <data key="d0">client</data>
      <data key="d1">0.25</data>
      <data key="d2">1024</data>
    </node>
    <node id="n1">
      <data key="d0">router</data>
      <data key="d3">512.5</data>
    </node>
    <edge source="n0" target="n1">
      <data key="e0">12.5</data>
      <data key="e1">0.01</data>
      <data key="e2">1.5</data>
      <data key="e3">50</data>
    </edge>
  </graph>
</graphml>"#;

    #[test]
    fn full_document() {
        let got = run(FULL_DOC, Some("client"), "latency");
        assert_eq!(
            got.nodes,
            vec![
                GmlNode {
                    name: "n0".to_string(),
                    client: true,
                    packet_loss: 0.25,
                    bandwidth_up: 1024.0,
                    bandwidth_down: 0.0,
                },
                GmlNode {
                    name: "n1".to_string(),
                    client: false,
                    packet_loss: 0.0,
                    bandwidth_up: 0.0,
                    bandwidth_down: 512.5,
                },
            ]
        );
        assert_eq!(
            got.links,
            vec![GmlLink {
                source: "n0".to_string(),
                target: "n1".to_string(),
                weight: 12.5,
                latency: 12.5,
                packet_loss: 0.01,
                jitter: 1.5,
                queue_len: 50,
            }]
        );
    }

    #[test]
    fn all_nodes_are_clients_without_discriminator() {
        let got = run(FULL_DOC, None, "latency");
        assert!(got.nodes.iter().all(|n| n.client));
    }

    #[test]
    fn weight_from_custom_key() {
        let doc = r#"<graphml>
  <key id="w" for="edge" attr.name="cost" attr.type="int"/>
  <graph edgedefault="undirected">
    <node id="a"/><node id="b"/>
    <edge source="a" target="b"><data key="w">7</data></edge>
  </graph>
</graphml>"#;
        let got = run(doc, None, "cost");
        assert_eq!(got.links[0].weight, 7.0);
        assert_eq!(got.links[0].latency, 0.0);
    }

    #[test]
    fn directed_edges_rejected() {
        let doc = r#"<graphml><graph edgedefault="directed">
            <node id="a"/><node id="b"/>
            <edge source="a" target="b"/>
        </graph></graphml>"#;
        assert!(matches!(
            run_err(doc, None, "latency"),
            GraphMlError::DirectedEdge(s, t) if s == "a" && t == "b"
        ));

        // An explicit directed="false" overrides the graph default.
        let doc = r#"<graphml><graph edgedefault="directed">
            <node id="a"/><node id="b"/>
            <edge source="a" target="b" directed="false"/>
        </graph></graphml>"#;
        assert_eq!(run(doc, None, "latency").links.len(), 1);

        // And directed="true" overrides an undirected default.
        let doc = r#"<graphml><graph edgedefault="undirected">
            <node id="a"/><node id="b"/>
            <edge source="a" target="b" directed="true"/>
        </graph></graphml>"#;
        assert!(matches!(run_err(doc, None, "latency"), GraphMlError::DirectedEdge(_, _)));
    }

    #[test]
    fn wrong_root_or_namespace() {
        assert!(matches!(
            run_err("<gexf><graph/></gexf>", None, "latency"),
            GraphMlError::NotGraphMl(name) if name == "gexf"
        ));
        assert!(matches!(
            run_err(r#"<graphml xmlns="http://example.com/not-graphml"/>"#, None, "latency"),
            GraphMlError::WrongNamespace(_)
        ));
    }

    #[test]
    fn unknown_elements_and_keys_are_skipped() {
        let doc = r#"<graphml>
  <key id="k" for="node" attr.name="color" attr.type="string"><default>red</default></key>
  <frobnicate><deeply><nested/></deeply></frobnicate>
  <graph edgedefault="undirected">
    <node id="a"><data key="k">blue</data><port name="p"/></node>
    <node id="b"><data key="missing">1</data></node>
    <edge source="a" target="b"/>
  </graph>
</graphml>"#;
        let got = run(doc, None, "latency");
        assert_eq!(got.nodes.len(), 2);
        assert_eq!(got.links.len(), 1);
    }

    #[test]
    fn key_type_mismatch_is_fatal() {
        let doc = r#"<graphml>
  <key id="d1" for="node" attr.name="packetloss" attr.type="string"/>
</graphml>"#;
        assert!(matches!(
            run_err(doc, None, "latency"),
            GraphMlError::KeyType(key, ty) if key == "packetloss" && ty == "string"
        ));

        // queue_len must be an integer, not a float.
        let doc = r#"<graphml>
  <key id="e3" for="edge" attr.name="queue_len" attr.type="double"/>
</graphml>"#;
        assert!(matches!(run_err(doc, None, "latency"), GraphMlError::KeyType(_, _)));
    }

    #[test]
    fn malformed_number_is_fatal() {
        let doc = r#"<graphml>
  <key id="e0" for="edge" attr.name="latency" attr.type="double"/>
  <graph edgedefault="undirected">
    <node id="a"/><node id="b"/>
    <edge source="a" target="b"><data key="e0">fast</data></edge>
  </graph>
</graphml>"#;
        assert!(matches!(
            run_err(doc, None, "latency"),
            GraphMlError::ValueParse(v, AttrType::Float) if v == "fast"
        ));
    }

    #[test]
    fn missing_required_attributes() {
        let doc = r#"<graphml><graph edgedefault="undirected"><node/></graph></graphml>"#;
        assert!(matches!(
            run_err(doc, None, "latency"),
            GraphMlError::MissingAttribute("node", "id")
        ));

        let doc = r#"<graphml><graph edgedefault="undirected">
            <node id="a"/><edge target="a"/>
        </graph></graphml>"#;
        assert!(matches!(
            run_err(doc, None, "latency"),
            GraphMlError::MissingAttribute("edge", "source")
        ));
    }

    #[test]
    fn values_tolerate_surrounding_whitespace() {
        let doc = r#"<graphml>
  <key id="e0" for="edge" attr.name="latency" attr.type="double"/>
  <graph edgedefault="undirected">
    <node id="a"/><node id="b"/>
    <edge source="a" target="b"><data key="e0">
      3.5
    </data></edge>
  </graph>
</graphml>"#;
        let got = run(doc, None, "latency");
        assert_eq!(got.links[0].latency, 3.5);
    }
}
