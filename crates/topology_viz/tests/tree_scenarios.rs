//! Integration tests for tree construction
//!
//! Builds trees from full snapshot documents and checks shape, levels,
//! sole marking and error behaviour.

use topology_viz::render::{render_html, render_text};
use topology_viz::tree::{self, ForestEntry, TreeBuilder, ROOT_LEVEL};
use topology_viz::{Error, TopologySnapshot, ViewNode};

fn macs(n: usize, seed: u8) -> String {
    (0..n)
        .map(|i| format!("\"02:00:00:00:{:02x}:{:02x}\": \"1\"", seed, i))
        .collect::<Vec<_>>()
        .join(", ")
}

fn snapshot(json: &str) -> TopologySnapshot {
    TopologySnapshot::from_json(json).unwrap()
}

// ============================================================================
// Reference scenarios
// ============================================================================

#[test]
fn test_single_device_without_uplinks() {
    let doc = format!(
        r#"{{ "devices": {{ "SW1": {{ "host": "SW1", "info": "", "ports": {{
            "p1": {{ "name": "p1", "macs": {{ {} }} }},
            "p2": {{ "name": "p2", "macs": {{}} }}
        }} }} }} }}"#,
        macs(3, 1)
    );
    let snap = snapshot(&doc);

    let root = tree::build("SW1", &snap.tree, &snap.devices, 1).unwrap();
    assert_eq!(root.depth, 1);
    assert_eq!(root.branches.len(), 1);
    assert_eq!(root.branches[0].port_id, "p1");
    assert_eq!(root.branches[0].label, "p1 (macs: 3)");
    assert!(root.branches[0].nested.is_none());
}

#[test]
fn test_uplink_chain_marks_sole() {
    let doc = format!(
        r#"{{
            "devices": {{
                "SW1": {{ "host": "SW1", "ports": {{ "p1": {{ "name": "p1", "macs": {{ {} }} }} }} }},
                "SW2": {{ "host": "SW2", "ports": {{ "p1": {{ "name": "p1", "macs": {{ {} }} }} }} }}
            }},
            "tree": {{
                "SW1": {{ "ports": {{ "p1": {{ "uplink": {{ "SW2": {{ "ports": {{}} }} }} }} }} }}
            }}
        }}"#,
        macs(3, 1),
        macs(2, 2)
    );
    let snap = snapshot(&doc);

    let root = tree::build("SW1", &snap.tree, &snap.devices, 1).unwrap();
    assert_eq!(root.key, "SW1");
    assert_eq!(root.depth, 1);
    assert_eq!(root.branches.len(), 1);
    assert!(root.branches[0].is_sole);

    let sw2 = root.branches[0].nested.as_deref().unwrap();
    assert_eq!(sw2.key, "SW2");
    assert_eq!(sw2.depth, 3);
    assert_eq!(sw2.branches.len(), 1);
    assert_eq!(sw2.branches[0].label, "p1 (macs: 2)");
    assert!(!sw2.branches[0].is_sole);
    assert!(sw2.branches[0].nested.is_none());
}

#[test]
fn test_unknown_root_fails() {
    let snap = snapshot(r#"{ "devices": { "SW1": { "host": "SW1" } } }"#);
    let result = tree::build("GHOST", &snap.tree, &snap.devices, 1);
    assert!(matches!(result, Err(Error::UnknownDevice(key)) if key == "GHOST"));
}

#[test]
fn test_build_is_idempotent() {
    let doc = format!(
        r#"{{
            "devices": {{
                "A": {{ "host": "A", "ports": {{ "1": {{ "name": "a1", "macs": {{ {} }} }}, "2": {{ "name": "a2", "macs": {{ {} }} }} }} }},
                "B": {{ "host": "B", "ports": {{ "1": {{ "name": "b1", "macs": {{ {} }} }} }} }}
            }},
            "tree": {{ "A": {{ "ports": {{ "2": {{ "uplink": {{ "B": {{}} }} }} }} }} }}
        }}"#,
        macs(1, 1),
        macs(4, 2),
        macs(1, 3)
    );
    let snap = snapshot(&doc);

    let first = tree::build("A", &snap.tree, &snap.devices, 1).unwrap();
    let second = tree::build("A", &snap.tree, &snap.devices, 1).unwrap();
    assert_eq!(first, second);
    assert_eq!(render_html(&first), render_html(&second));
}

// ============================================================================
// Deeper graphs
// ============================================================================

/// Core switch with two access switches, one of which feeds a third.
fn campus() -> TopologySnapshot {
    let doc = format!(
        r#"{{
            "devices": {{
                "10.0.0.1": {{ "host": "10.0.0.1", "info": "core<br>room 101", "ports": {{
                    "1": {{ "name": "ge1", "macs": {{ {} }} }},
                    "2": {{ "name": "ge2", "macs": {{ {} }} }},
                    "3": {{ "name": "ge3", "macs": {{}} }}
                }} }},
                "10.0.0.2": {{ "host": "10.0.0.2", "info": "floor 1", "ports": {{
                    "24": {{ "name": "fe24", "macs": {{ {} }} }}
                }} }},
                "10.0.0.3": {{ "host": "10.0.0.3", "info": "floor 2", "ports": {{
                    "1": {{ "name": "fe1", "macs": {{ {} }} }},
                    "2": {{ "name": "fe2", "macs": {{ {} }} }}
                }} }},
                "10.0.0.4": {{ "host": "10.0.0.4", "info": "lab", "ports": {{
                    "8": {{ "name": "fe8", "macs": {{ {} }} }}
                }} }}
            }},
            "macs": {{}},
            "tree": {{
                "10.0.0.1": {{
                    "host": "10.0.0.1",
                    "device_macs_counter": 30,
                    "ports": {{
                        "1": {{ "port_name": "ge1", "port_macs_counter": 5, "links": ["10.0.0.2"],
                                "uplink": {{ "10.0.0.2": {{ "ports": {{}} }} }} }},
                        "2": {{ "port_name": "ge2", "port_macs_counter": 9, "links": ["10.0.0.3", "10.0.0.4"],
                                "uplink": {{ "10.0.0.3": {{ "ports": {{
                                    "1": {{ "uplink": {{ "10.0.0.4": {{ "ports": {{}} }} }} }}
                                }} }} }} }}
                    }}
                }}
            }}
        }}"#,
        macs(5, 1),
        macs(9, 2),
        macs(2, 3),
        macs(3, 4),
        macs(1, 5),
        macs(1, 6)
    );
    snapshot(&doc)
}

#[test]
fn test_campus_shape() {
    let snap = campus();
    let forest = TreeBuilder::new(&snap.devices).build_forest(&snap.tree).unwrap();
    assert_eq!(forest.len(), 1);

    let core = &forest[0];
    assert_eq!(core.label, "10.0.0.1\ncore<br>room 101");
    assert_eq!(core.device_count(), 4);
    assert_eq!(core.max_depth(), 5);

    let labels: Vec<_> = core.branches.iter().map(|b| b.label.as_str()).collect();
    assert_eq!(labels, vec!["ge1 (macs: 5)", "ge2 (macs: 9)"]);
    assert!(core.branches.iter().all(|b| !b.is_sole));

    let floor2 = core.branches[1].nested.as_deref().unwrap();
    assert_eq!(floor2.depth, 3);
    assert_eq!(floor2.branches.len(), 2);
    assert!(floor2.branches.iter().all(|b| !b.is_sole));

    let lab = floor2.branches[0].nested.as_deref().unwrap();
    assert_eq!(lab.key, "10.0.0.4");
    assert_eq!(lab.depth, 5);
}

#[test]
fn test_nested_depth_is_parent_plus_two() {
    fn check(node: &ViewNode) {
        for branch in &node.branches {
            if let Some(nested) = branch.nested.as_deref() {
                assert_eq!(nested.depth, node.depth + 2);
                check(nested);
            }
        }
    }
    let snap = campus();
    check(&tree::build("10.0.0.1", &snap.tree, &snap.devices, ROOT_LEVEL).unwrap());
}

#[test]
fn test_campus_text_render() {
    let snap = campus();
    let root = tree::build("10.0.0.1", &snap.tree, &snap.devices, 1).unwrap();
    let text = render_text(&root);
    let expected = "\
10.0.0.1 [core / room 101]
├── ge1 (macs: 5)
│   └── 10.0.0.2 [floor 1]
│       └── fe24 (macs: 2)
└── ge2 (macs: 9)
    └── 10.0.0.3 [floor 2]
        ├── fe1 (macs: 3)
        │   └── 10.0.0.4 [lab]
        │       └── fe8 (macs: 1)
        └── fe2 (macs: 1)
";
    assert_eq!(text, expected);
}

#[test]
fn test_campus_html_levels() {
    let snap = campus();
    let root = tree::build("10.0.0.1", &snap.tree, &snap.devices, 1).unwrap();
    let html = render_html(&root);
    for level in 1..=5 {
        assert!(html.contains(&format!("branch lv{}\"", level)), "missing lv{}", level);
    }
    assert!(!html.contains("branch lv6"));
}

#[test]
fn test_lenient_forest_keeps_good_roots() {
    let mut snap = campus();
    snap.tree.insert("10.9.9.9".into(), Default::default());

    let builder = TreeBuilder::new(&snap.devices);
    let entries = builder.build_forest_lenient(&snap.tree);
    assert_eq!(entries.len(), 2);
    assert!(matches!(&entries[0], ForestEntry::Built { tree } if tree.device_count() == 4));
    assert!(matches!(
        &entries[1],
        ForestEntry::Failed { key, error } if key == "10.9.9.9" && error.contains("Unknown device")
    ));
}

#[test]
fn test_uplink_to_missing_device_fails_whole_tree() {
    let mut snap = campus();
    snap.devices.shift_remove("10.0.0.4");
    let result = tree::build("10.0.0.1", &snap.tree, &snap.devices, 1);
    assert!(matches!(result, Err(Error::UnknownDevice(key)) if key == "10.0.0.4"));
}
