use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};
use std::collections::HashSet;

/// Index a newly appended sibling receives: one past the current maximum.
pub fn next_order_index(existing: &[i32]) -> i32 {
    existing.iter().max().map_or(0, |max| max + 1)
}

/// Moves `id` to position `target` (clamped into range) and returns the new
/// sibling order. `id` is appended first when it is not yet in the list.
pub fn place(ordered_ids: &[String], id: &str, target: i32) -> Vec<String> {
    let mut ids: Vec<String> = ordered_ids
        .iter()
        .filter(|existing| existing.as_str() != id)
        .cloned()
        .collect();
    let position = (target.max(0) as usize).min(ids.len());
    ids.insert(position, id.to_string());
    ids
}

/// A reorder request must name every current sibling exactly once and nothing else.
pub fn validate_permutation(current: &[String], requested: &[String]) -> Result<(), String> {
    let mut seen = HashSet::with_capacity(requested.len());
    for id in requested {
        if !seen.insert(id.as_str()) {
            return Err(format!("Duplicate id '{}' in reorder request", id));
        }
    }

    let current_set: HashSet<&str> = current.iter().map(String::as_str).collect();
    if let Some(foreign) = requested.iter().find(|id| !current_set.contains(id.as_str())) {
        return Err(format!("Id '{}' does not belong to this parent", foreign));
    }

    if requested.len() != current.len() {
        return Err(format!(
            "Reorder request lists {} ids but the parent has {} children",
            requested.len(),
            current.len()
        ));
    }

    Ok(())
}

/// Writes `order_index = position` for every id, in one pass.
pub async fn assign_order<E, C>(
    conn: &C,
    id_column: E::Column,
    order_column: E::Column,
    ordered_ids: &[String],
) -> Result<(), DbErr>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    for (index, id) in ordered_ids.iter().enumerate() {
        E::update_many()
            .col_expr(order_column, Expr::value(index as i32))
            .filter(id_column.eq(id.as_str()))
            .exec(conn)
            .await?;
    }
    Ok(())
}
