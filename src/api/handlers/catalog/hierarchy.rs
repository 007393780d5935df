//! Category hierarchy maintenance.
//!
//! `level` is denormalized: `0` for roots and `parent.level + 1` otherwise. It is
//! computed here at write time, and the storage layer refreshes descendants when
//! a category moves. Parent assignments are checked against the ancestor chain so
//! the tree can never contain a cycle.
//!
//! The tree helpers (`children_of`, `roots`, `build_tree`) operate on a list that
//! was already loaded with `fetch_categories` and never touch the database.

use std::collections::HashSet;
use uuid::Uuid;

use super::{
    error::CatalogError,
    lookup::CatalogLookup,
    types::{CategoryNode, CategoryResponse},
};

const PARENT_NOT_FOUND: &str = "Parent category not found";
const PARENT_CYCLE: &str = "A category cannot be nested under itself or one of its subcategories";

/// Returns the level a category gets under `parent_id`.
/// A parent id that points nowhere is rejected instead of silently producing a root.
pub async fn compute_level<L>(lookup: &mut L, parent_id: Option<Uuid>) -> Result<i32, CatalogError>
where
    L: CatalogLookup + ?Sized,
{
    let Some(parent_id) = parent_id else {
        return Ok(0);
    };

    match lookup.category_level(parent_id).await? {
        Some(level) => Ok(level.saturating_add(1)),
        None => Err(CatalogError::Validation(PARENT_NOT_FOUND)),
    }
}

/// Rejects making `parent_id` the parent of `category_id` when `category_id` is
/// the parent itself or one of its ancestors.
pub async fn ensure_acyclic<L>(
    lookup: &mut L,
    category_id: Uuid,
    parent_id: Option<Uuid>,
) -> Result<(), CatalogError>
where
    L: CatalogLookup + ?Sized,
{
    let Some(parent_id) = parent_id else {
        return Ok(());
    };

    if parent_id == category_id {
        return Err(CatalogError::Validation(PARENT_CYCLE));
    }

    let ancestors = lookup.category_ancestors(parent_id).await?;
    if ancestors.contains(&category_id) {
        return Err(CatalogError::Validation(PARENT_CYCLE));
    }

    Ok(())
}

/// Direct children of `parent_id`, ordered by `sort_order`.
/// The sort is stable, so ties keep the incoming (name) order.
pub fn children_of(categories: &[CategoryResponse], parent_id: Uuid) -> Vec<&CategoryResponse> {
    let mut children: Vec<&CategoryResponse> = categories
        .iter()
        .filter(|category| category.parent_id == Some(parent_id))
        .collect();
    children.sort_by_key(|category| category.sort_order);
    children
}

/// Root categories (`level == 0`), ordered by `sort_order`.
pub fn roots(categories: &[CategoryResponse]) -> Vec<&CategoryResponse> {
    let mut roots: Vec<&CategoryResponse> = categories
        .iter()
        .filter(|category| category.level == 0)
        .collect();
    roots.sort_by_key(|category| category.sort_order);
    roots
}

/// Nests the flat category list into a forest.
/// Each category is placed at most once, so corrupted parent links cannot recurse forever.
pub fn build_tree(categories: &[CategoryResponse]) -> Vec<CategoryNode> {
    let mut placed = HashSet::new();
    roots(categories)
        .into_iter()
        .filter_map(|root| build_node(categories, root, &mut placed))
        .collect()
}

fn build_node(
    categories: &[CategoryResponse],
    category: &CategoryResponse,
    placed: &mut HashSet<Uuid>,
) -> Option<CategoryNode> {
    if !placed.insert(category.id) {
        return None;
    }

    let children = children_of(categories, category.id)
        .into_iter()
        .filter_map(|child| build_node(categories, child, placed))
        .collect();

    Some(CategoryNode {
        id: category.id,
        name: category.name.clone(),
        description: category.description.clone(),
        color: category.color.clone(),
        level: category.level,
        sort_order: category.sort_order,
        count: category.count,
        children,
    })
}
