//! `opsdesk permissions`: the system permissions grouped per resource.

use anyhow::Result;
use opsdesk_client::Console;
use opsdesk_core::Partition;

use super::print_value;

pub async fn list(console: &Console, output_json: bool) -> Result<()> {
    let partition = console.permission_groups().await?;
    if output_json {
        return print_value(&serde_json::to_value(&partition)?, true);
    }
    print!("{}", render(&partition));
    Ok(())
}

fn render(partition: &Partition) -> String {
    let mut out = String::new();
    for group in &partition.groups {
        out.push_str(&format!("{} ({})\n", group.resource, group.label_key));
        for p in &group.children {
            out.push_str(&format!("  {:<8} {}\n", p.id.to_string(), p.name.as_deref().unwrap_or("")));
        }
    }
    if !partition.others.is_empty() {
        out.push_str("others\n");
        for p in &partition.others {
            out.push_str(&format!("  {:<8} {}\n", p.id.to_string(), p.name.as_deref().unwrap_or("-")));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsdesk_core::{partition, Permission};

    #[test]
    fn render_lists_groups_then_others() {
        let mut unnamed = Permission::new(3, "");
        unnamed.name = None;
        let parts = partition(&[
            Permission::new(1, "product_view"),
            Permission::new(2, "employee_edit"),
            unnamed,
        ]);
        let text = render(&parts);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "employee (permissions.manage_employee)");
        assert!(lines[1].contains("employee_edit"));
        assert_eq!(lines[2], "product (permissions.manage_product)");
        assert_eq!(lines[4], "others");
        assert!(lines[5].trim_start().starts_with('3'));
    }
}
