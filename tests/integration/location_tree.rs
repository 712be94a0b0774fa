//! Integration tests for the process-wide location tree

use waypost::context::Context;
use waypost::location::{location_path, LocationNode, LocationTree};

fn node(type_name: &str, id: &str) -> LocationNode {
    LocationNode::new(Context::new(type_name, id))
}

#[test]
fn test_nested_duplicate_regions_report_each_path_once() {
    let mut tree = LocationTree::new();
    let root = node("RootLocationContext", "home");
    let first = node("ContentContext", "promo");
    let second = node("ContentContext", "promo");
    tree.add(root.clone(), None).unwrap();
    tree.add(first.clone(), Some(&root)).unwrap();
    tree.add(second.clone(), Some(&root)).unwrap();
    tree.add(node("LinkContext", "cta"), Some(&first)).unwrap();
    tree.add(node("LinkContext", "cta"), Some(&second)).unwrap();

    assert_eq!(
        tree.reported_collisions(),
        vec![
            "RootLocationContext:home / ContentContext:promo",
            "RootLocationContext:home / ContentContext:promo / LinkContext:cta",
        ]
    );

    // Unmounting one region resolves the ambiguity; remounting it does not
    // report the same paths again.
    assert_eq!(tree.remove(&second), 2);
    assert!(tree.validate().is_empty());
    let again = node("ContentContext", "promo");
    tree.add(again.clone(), Some(&root)).unwrap();
    tree.add(node("LinkContext", "cta"), Some(&again)).unwrap();
    assert_eq!(tree.reported_collisions().len(), 2);
}

#[test]
fn test_readding_a_node_moves_it() {
    let mut tree = LocationTree::new();
    let home = node("RootLocationContext", "home");
    let about = node("RootLocationContext", "about");
    let link = node("LinkContext", "cta");
    tree.add(home.clone(), None).unwrap();
    tree.add(about.clone(), None).unwrap();
    tree.add(link.clone(), Some(&home)).unwrap();
    tree.add(link.clone(), Some(&about)).unwrap();

    assert_eq!(tree.len(), 3);
    assert!(tree.children(&home).is_empty());
    assert_eq!(tree.children(&about), vec![&link]);
}

#[test]
fn test_global_tree_is_shared() {
    let root = LocationNode::with_location_id(
        "global-test-root",
        Context::new("RootLocationContext", "global-test"),
    );
    LocationTree::global().lock().add(root.clone(), None).unwrap();
    assert!(LocationTree::global().lock().contains("global-test-root"));
    assert_eq!(LocationTree::global().lock().remove(&root), 1);
    assert!(!LocationTree::global().lock().contains("global-test-root"));
}

#[test]
fn test_path_of_mounted_branch() {
    let stack = vec![
        Context::new("RootLocationContext", "home"),
        Context::new("NavigationContext", "main"),
        Context::new("LinkContext", "about"),
    ];
    assert_eq!(
        location_path(&stack),
        "RootLocationContext:home / NavigationContext:main / LinkContext:about"
    );
}
