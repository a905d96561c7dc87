//! Category display formatting

use crate::models::Category;

/// Categories as a flat list, children indented under their parent
pub fn format_category_list(categories: &[Category]) -> String {
    if categories.is_empty() {
        return "No categories found.\n".to_string();
    }

    let mut output = String::new();
    for root in categories.iter().filter(|c| c.parent_id.is_none()) {
        output.push_str(&format!("{:<6}  {}\n", root.id.to_string(), root.name));
        for child in categories.iter().filter(|c| c.parent_id == Some(root.id)) {
            output.push_str(&format!("{:<6}    {}\n", child.id.to_string(), child.name));
        }
    }

    // Children of children, or children listed without their parent
    for orphan in categories.iter().filter(|c| {
        c.parent_id
            .is_some_and(|p| !categories.iter().any(|r| r.id == p && r.parent_id.is_none()))
    }) {
        output.push_str(&format!("{:<6}  {}\n", orphan.id.to_string(), orphan.name));
    }

    output
}
