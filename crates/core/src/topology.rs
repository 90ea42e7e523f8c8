#![forbid(unsafe_code)]

pub const ULTRA_MAGNUS: &str = "ultra_magnus";
pub const SKY_LYNX: &str = "sky_lynx";
pub const ACADEMY: &str = "academy";

pub const NODE_IDS: [&str; 3] = [ULTRA_MAGNUS, SKY_LYNX, ACADEMY];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Geometry {
    Icosahedron,
    Octahedron,
    Dodecahedron,
}

impl Geometry {
    pub fn as_str(self) -> &'static str {
        match self {
            Geometry::Icosahedron => "icosahedron",
            Geometry::Octahedron => "octahedron",
            Geometry::Dodecahedron => "dodecahedron",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeStyle {
    pub node_id: &'static str,
    pub display_name: &'static str,
    pub color_hex: &'static str,
    pub position: [f64; 3],
    pub geometry: Geometry,
}

/// Triangle layout: the capture node on top, the other two below it.
pub static NODE_STYLES: [NodeStyle; 3] = [
    NodeStyle {
        node_id: ULTRA_MAGNUS,
        display_name: "Ultra Magnus",
        color_hex: "#3b82f6",
        position: [0.0, 2.0, 0.0],
        geometry: Geometry::Icosahedron,
    },
    NodeStyle {
        node_id: SKY_LYNX,
        display_name: "Sky-Lynx",
        color_hex: "#f59e0b",
        position: [-2.5, -1.2, 0.0],
        geometry: Geometry::Octahedron,
    },
    NodeStyle {
        node_id: ACADEMY,
        display_name: "Academy",
        color_hex: "#10b981",
        position: [2.5, -1.2, 0.0],
        geometry: Geometry::Dodecahedron,
    },
];

pub static DEFAULT_NODE_STYLE: NodeStyle = NodeStyle {
    node_id: "unknown",
    display_name: "Unknown",
    color_hex: "#888888",
    position: [0.0, 0.0, 0.0],
    geometry: Geometry::Icosahedron,
};

pub fn node_style(node_id: &str) -> &'static NodeStyle {
    NODE_STYLES
        .iter()
        .find(|style| style.node_id == node_id)
        .unwrap_or(&DEFAULT_NODE_STYLE)
}

/// Canonical id for a known node; `None` for anything off the map.
pub fn known_node(node_id: &str) -> Option<&'static str> {
    NODE_IDS.iter().copied().find(|id| *id == node_id)
}
