//! FILENAME: core/cellset-engine/src/unique_name.rs
//! Element unique name helpers.
//!
//! Unique names come in two forms: `[dimension].[element]` with an implicit
//! hierarchy named after the dimension, and `[dimension].[hierarchy].[element]`.

use std::borrow::Borrow;

use insensitive::InsensitiveMapping;

/// `[Region].[Europe].[UK]` -> `Region`
pub fn dimension_name_from_element_unique_name(element_unique_name: &str) -> &str {
    match element_unique_name.find("].[") {
        Some(end) => element_unique_name.get(1..end).unwrap_or(""),
        None => element_unique_name.trim_start_matches('[').trim_end_matches(']'),
    }
}

/// `[Region].[Europe].[UK]` -> `Europe`. Empty for the two-part form.
pub fn hierarchy_name_from_element_unique_name(element_unique_name: &str) -> &str {
    let (first, last) = match (
        element_unique_name.find("].["),
        element_unique_name.rfind("].["),
    ) {
        (Some(first), Some(last)) => (first, last),
        _ => return "",
    };
    element_unique_name.get(first + 3..last).unwrap_or("")
}

/// `[Region].[Europe].[UK]` -> `UK`
pub fn element_name_from_element_unique_name(element_unique_name: &str) -> &str {
    match element_unique_name.rfind("].[") {
        Some(start) => {
            let tail = &element_unique_name[start + 3..];
            tail.strip_suffix(']').unwrap_or(tail)
        }
        None => element_unique_name,
    }
}

/// Splits a unique name into dimension, hierarchy and element. The implicit
/// hierarchy of the two-part form is the dimension itself.
pub fn dimension_hierarchy_element_from_unique_name(element_unique_name: &str) -> (&str, &str, &str) {
    let dimension = dimension_name_from_element_unique_name(element_unique_name);
    let element = element_name_from_element_unique_name(element_unique_name);
    if element_unique_name.matches("].[").count() == 1 {
        return (dimension, dimension, element);
    }
    (
        dimension,
        hierarchy_name_from_element_unique_name(element_unique_name),
        element,
    )
}

pub fn element_names_from_element_unique_names<S: AsRef<str>>(element_unique_names: &[S]) -> Vec<String> {
    element_unique_names
        .iter()
        .map(|name| element_name_from_element_unique_name(name.as_ref()).to_string())
        .collect()
}

/// Zips dimension, element and (optionally) hierarchy names into unique names.
pub fn build_element_unique_names<S: AsRef<str>>(
    dimension_names: &[S],
    element_names: &[S],
    hierarchy_names: Option<&[S]>,
) -> Vec<String> {
    match hierarchy_names {
        None => dimension_names
            .iter()
            .zip(element_names)
            .map(|(dim, elem)| format!("[{}].[{}]", dim.as_ref(), elem.as_ref()))
            .collect(),
        Some(hierarchies) => dimension_names
            .iter()
            .zip(hierarchies)
            .zip(element_names)
            .map(|((dim, hier), elem)| {
                format!("[{}].[{}].[{}]", dim.as_ref(), hier.as_ref(), elem.as_ref())
            })
            .collect(),
    }
}

// ============================================================================
// COORDINATE ORDERING
// ============================================================================

/// Position of each cube dimension, looked up by name.
pub(crate) fn dimension_ranks<S: AsRef<str>>(cube_dimensions: &[S]) -> InsensitiveMapping<usize> {
    cube_dimensions
        .iter()
        .enumerate()
        .map(|(rank, dim)| (dim.as_ref().to_string(), rank))
        .collect()
}

/// Rank of a coordinate fragment. Fragments of unknown dimensions rank after
/// every cube dimension and are logged.
pub(crate) fn fragment_rank(ranks: &InsensitiveMapping<usize>, fragment: &str) -> usize {
    match ranks.get(dimension_name_from_element_unique_name(fragment)) {
        Some(rank) => *rank,
        None => {
            log::warn!(target: "CELLSET", "coordinate {} matches no cube dimension", fragment);
            ranks.len()
        }
    }
}

/// Stable sort by rank: same-dimension fragments stay in encounter order.
pub(crate) fn order_by_rank<R: Borrow<(usize, String)>>(ranked: &mut [R]) {
    ranked.sort_by_key(|entry| entry.borrow().0);
}

/// Reorders coordinate fragments into cube dimension order.
///
/// Several fragments of one dimension (multiple hierarchies) keep the order
/// in which they were encountered. Fragments whose dimension is not part of
/// the cube are kept at the end.
pub fn sort_coordinates<S: AsRef<str>>(cube_dimensions: &[S], unsorted_coordinates: Vec<String>) -> Vec<String> {
    let ranks = dimension_ranks(cube_dimensions);
    let mut ranked: Vec<(usize, String)> = unsorted_coordinates
        .into_iter()
        .map(|fragment| (fragment_rank(&ranks, &fragment), fragment))
        .collect();
    order_by_rank(&mut ranked);
    ranked.into_iter().map(|(_, fragment)| fragment).collect()
}
