//! Parent/child trees for self-referencing tables (categories, locations,
//! buildings).
//!
//! Trees are small, so the whole table is loaded and assembled in memory.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;

/// A row that points at an optional parent of the same type.
pub trait TreeItem {
    fn id(&self) -> Uuid;
    fn parent_id(&self) -> Option<Uuid>;
    /// Sort key among siblings.
    fn sort_key(&self) -> String;
}

/// A node of an assembled tree.
#[derive(Debug, Serialize)]
pub struct TreeNode<T> {
    #[serde(flatten)]
    pub item: T,
    pub children: Vec<TreeNode<T>>,
}

/// Assemble flat rows into a forest.
///
/// Roots are rows without a parent, plus rows whose parent is not in `items`
/// (orphans are surfaced rather than lost). Siblings are sorted by
/// `sort_key`. Rows caught in a parent cycle are never reachable from a
/// root and are dropped.
pub fn build_tree<T: TreeItem>(items: Vec<T>) -> Vec<TreeNode<T>> {
    let ids: HashSet<Uuid> = items.iter().map(|item| item.id()).collect();

    let mut by_parent: HashMap<Option<Uuid>, Vec<T>> = HashMap::new();
    for item in items {
        let parent = item.parent_id().filter(|p| ids.contains(p));
        by_parent.entry(parent).or_default().push(item);
    }

    attach(None, &mut by_parent)
}

fn attach<T: TreeItem>(
    parent: Option<Uuid>,
    by_parent: &mut HashMap<Option<Uuid>, Vec<T>>,
) -> Vec<TreeNode<T>> {
    let mut level = by_parent.remove(&parent).unwrap_or_default();
    level.sort_by_key(|item| item.sort_key());

    level
        .into_iter()
        .map(|item| {
            let children = attach(Some(item.id()), by_parent);
            TreeNode { item, children }
        })
        .collect()
}

/// Check that `node` may hang under `new_parent`.
///
/// `parents` maps every existing id to its current parent. Fails when the new
/// parent is the node itself, does not exist, or is one of the node's
/// descendants.
pub fn ensure_valid_parent(
    entity: &'static str,
    node: Option<Uuid>,
    new_parent: Option<Uuid>,
    parents: &HashMap<Uuid, Option<Uuid>>,
) -> Result<(), AppError> {
    let Some(new_parent) = new_parent else {
        return Ok(());
    };

    if !parents.contains_key(&new_parent) {
        return Err(AppError::InvalidRequest(format!(
            "Parent {} does not exist",
            entity.to_lowercase()
        )));
    }

    let Some(node) = node else {
        return Ok(());
    };

    // Walk up from the proposed parent; meeting `node` means a cycle.
    let mut seen = HashSet::new();
    let mut cursor = Some(new_parent);
    while let Some(current) = cursor {
        if current == node {
            return Err(AppError::InvalidOperation(format!(
                "{entity} cannot be moved under itself or one of its descendants"
            )));
        }
        if !seen.insert(current) {
            break;
        }
        cursor = parents.get(&current).copied().flatten();
    }

    Ok(())
}

/// Load `(id, parent_id)` pairs for a tree table.
pub async fn load_parents(
    pool: &crate::db::DbPool,
    table: &'static str,
) -> Result<HashMap<Uuid, Option<Uuid>>, AppError> {
    let sql = format!("SELECT id, parent_id FROM {table}");
    let rows: Vec<(Uuid, Option<Uuid>)> = sqlx::query_as(&sql).fetch_all(pool).await?;
    Ok(rows.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Node {
        id: Uuid,
        parent: Option<Uuid>,
        name: &'static str,
    }

    impl TreeItem for Node {
        fn id(&self) -> Uuid {
            self.id
        }
        fn parent_id(&self) -> Option<Uuid> {
            self.parent
        }
        fn sort_key(&self) -> String {
            self.name.to_string()
        }
    }

    fn node(name: &'static str, parent: Option<Uuid>) -> Node {
        Node {
            id: Uuid::new_v4(),
            parent,
            name,
        }
    }

    #[test]
    fn builds_nested_sorted_forest() {
        let utilities = node("Utilities", None);
        let program = node("Program", None);
        let water = node("Water", Some(utilities.id));
        let electric = node("Electric", Some(utilities.id));
        let meter = node("Meter fees", Some(electric.id));

        let tree = build_tree(vec![
            water.clone(),
            meter.clone(),
            utilities.clone(),
            program.clone(),
            electric.clone(),
        ]);

        let roots: Vec<_> = tree.iter().map(|n| n.item.name).collect();
        assert_eq!(roots, vec!["Program", "Utilities"]);

        let utilities_children: Vec<_> = tree[1].children.iter().map(|n| n.item.name).collect();
        assert_eq!(utilities_children, vec!["Electric", "Water"]);
        assert_eq!(tree[1].children[0].children[0].item.name, "Meter fees");
    }

    #[test]
    fn orphans_become_roots() {
        let orphan = node("Orphan", Some(Uuid::new_v4()));
        let tree = build_tree(vec![orphan]);
        assert_eq!(tree.len(), 1);
        assert!(tree[0].children.is_empty());
    }

    fn parents_of(nodes: &[&Node]) -> HashMap<Uuid, Option<Uuid>> {
        nodes.iter().map(|n| (n.id, n.parent)).collect()
    }

    #[test]
    fn rejects_moving_under_descendant() {
        let root = node("Root", None);
        let child = node("Child", Some(root.id));
        let grandchild = node("Grandchild", Some(child.id));
        let parents = parents_of(&[&root, &child, &grandchild]);

        let err = ensure_valid_parent("Category", Some(root.id), Some(grandchild.id), &parents)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidOperation(_)));

        assert!(ensure_valid_parent("Category", Some(root.id), Some(root.id), &parents).is_err());
    }

    #[test]
    fn accepts_moving_to_sibling_branch() {
        let a = node("A", None);
        let b = node("B", None);
        let a1 = node("A1", Some(a.id));
        let parents = parents_of(&[&a, &b, &a1]);

        assert!(ensure_valid_parent("Location", Some(a1.id), Some(b.id), &parents).is_ok());
        assert!(ensure_valid_parent("Location", Some(a1.id), None, &parents).is_ok());
        assert!(ensure_valid_parent("Location", None, Some(a.id), &parents).is_ok());
    }

    #[test]
    fn unknown_parent_is_invalid_request() {
        let err = ensure_valid_parent("Building", None, Some(Uuid::new_v4()), &HashMap::new())
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }
}
