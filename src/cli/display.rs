//! Display formatting for CLI output
//!
//! SBIO pattern: Pure functions that format data for display

use std::fmt::Display;

use chrono::{DateTime, SecondsFormat, Utc};
use clap::ValueEnum;
use serde::Serialize;

use super::commands::ContextInfo;
use crate::model::clusters_mgmt::{
    AddOn, AddOnInstallation, Cluster, Credentials, Group, User, Version,
};
use crate::model::service_logs::LogEntry;
use crate::model::Resource;

/// Output format of the commands that print resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

// ============================================================================
// Table formatting helpers
// ============================================================================

/// Format a simple table with headers and rows
pub fn format_table(headers: &[&str], rows: Vec<Vec<String>>) -> String {
    if rows.is_empty() {
        return "No resources found.\n".to_string();
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let mut output = String::new();

    for (i, header) in headers.iter().enumerate() {
        if i > 0 {
            output.push_str("   ");
        }
        output.push_str(&format!(
            "{:width$}",
            header.to_uppercase(),
            width = widths[i]
        ));
    }
    trim_line(&mut output);

    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i > 0 {
                output.push_str("   ");
            }
            if i < widths.len() {
                output.push_str(&format!("{:width$}", cell, width = widths[i]));
            } else {
                output.push_str(cell);
            }
        }
        trim_line(&mut output);
    }

    output
}

/// Ends the current line, without padding after the last column.
fn trim_line(output: &mut String) {
    let trimmed = output.trim_end_matches(' ').len();
    output.truncate(trimmed);
    output.push('\n');
}

/// Pretty JSON, as printed by `-o json`
pub fn format_json<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    Ok(text)
}

/// Line printed under a partial page, e.g. "Showing 10 of 42 items."
pub fn format_page_summary(shown: usize, total: i32) -> Option<String> {
    if total > shown as i32 {
        Some(format!("Showing {} of {} items.\n", shown, total))
    } else {
        None
    }
}

fn cell<T: Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn link_id<T: Resource>(value: Option<&T>) -> String {
    cell(value.and_then(|v| v.object_id()))
}

fn timestamp(value: Option<DateTime<Utc>>) -> String {
    cell(value.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true)))
}

// ============================================================================
// Context display
// ============================================================================

/// Format context list for display
pub fn format_context_list(contexts: &[ContextInfo]) -> String {
    let headers = &["", "NAME", "URL"];
    let rows: Vec<Vec<String>> = contexts
        .iter()
        .map(|ctx| {
            vec![
                if ctx.is_current { "*" } else { " " }.to_string(),
                ctx.name.clone(),
                ctx.url.clone(),
            ]
        })
        .collect();

    format_table(headers, rows)
}

/// Format current context for display
pub fn format_current_context(name: &str, url: &str) -> String {
    format!("Current context: {} ({})\n", name, url)
}

// ============================================================================
// Cluster display
// ============================================================================

pub fn format_cluster_list(clusters: &[Cluster]) -> String {
    let headers = &["ID", "NAME", "STATE", "VERSION", "REGION", "MULTI-AZ"];
    let rows = clusters
        .iter()
        .map(|c| {
            vec![
                cell(c.object_id()),
                cell(c.name.as_deref()),
                cell(c.state),
                cell(c.openshift_version.as_deref()),
                link_id(c.region.as_ref()),
                cell(c.multi_az),
            ]
        })
        .collect();

    format_table(headers, rows)
}

/// Format a single cluster as `key: value` lines
pub fn format_cluster(cluster: &Cluster) -> String {
    let nodes = cluster.nodes.as_ref();
    let fields = [
        ("ID", cell(cluster.object_id())),
        ("External ID", cell(cluster.external_id.as_deref())),
        ("Name", cell(cluster.name.as_deref())),
        ("Display Name", cell(cluster.display_name.as_deref())),
        ("State", cell(cluster.state)),
        ("Version", cell(cluster.openshift_version.as_deref())),
        ("Provider", link_id(cluster.cloud_provider.as_ref())),
        ("Region", link_id(cluster.region.as_ref())),
        ("Multi-AZ", cell(cluster.multi_az)),
        ("Compute Nodes", cell(nodes.and_then(|n| n.compute))),
        (
            "API URL",
            cell(cluster.api.as_ref().and_then(|a| a.url.as_deref())),
        ),
        (
            "Console URL",
            cell(cluster.console.as_ref().and_then(|c| c.url.as_deref())),
        ),
        ("Created", timestamp(cluster.creation_timestamp)),
    ];

    let width = fields.iter().map(|(k, _)| k.len()).max().unwrap_or(0) + 1;
    fields
        .iter()
        .map(|(key, value)| format!("{:width$} {}\n", format!("{}:", key), value, width = width))
        .collect()
}

pub fn format_credentials(credentials: &Credentials) -> String {
    let admin = credentials.admin.as_ref();
    let mut output = format!(
        "User:     {}\nPassword: {}\n",
        cell(admin.and_then(|a| a.user.as_deref())),
        cell(admin.and_then(|a| a.password.as_deref()))
    );
    if let Some(ref kubeconfig) = credentials.kubeconfig {
        output.push('\n');
        output.push_str(kubeconfig);
        if !kubeconfig.ends_with('\n') {
            output.push('\n');
        }
    }
    output
}

// ============================================================================
// Catalog display
// ============================================================================

pub fn format_addon_list(addons: &[AddOn]) -> String {
    let headers = &["ID", "NAME", "ENABLED", "NAMESPACE"];
    let rows = addons
        .iter()
        .map(|a| {
            vec![
                cell(a.object_id()),
                cell(a.name.as_deref()),
                cell(a.enabled),
                cell(a.target_namespace.as_deref()),
            ]
        })
        .collect();

    format_table(headers, rows)
}

pub fn format_addon_installation_list(installations: &[AddOnInstallation]) -> String {
    let headers = &["ID", "STATE", "OPERATOR VERSION", "UPDATED"];
    let rows = installations
        .iter()
        .map(|i| {
            vec![
                cell(i.object_id()),
                cell(i.state.map(|s| format!("{:?}", s).to_lowercase())),
                cell(i.operator_version.as_deref()),
                timestamp(i.updated_timestamp),
            ]
        })
        .collect();

    format_table(headers, rows)
}

pub fn format_version_list(versions: &[Version]) -> String {
    let headers = &["ID", "RAW ID", "CHANNEL", "ENABLED", "DEFAULT"];
    let rows = versions
        .iter()
        .map(|v| {
            vec![
                cell(v.object_id()),
                cell(v.raw_id.as_deref()),
                cell(v.channel_group.as_deref()),
                cell(v.enabled),
                if v.default_version == Some(true) { "*" } else { "" }.to_string(),
            ]
        })
        .collect();

    format_table(headers, rows)
}

// ============================================================================
// Groups and users display
// ============================================================================

pub fn format_group_list(groups: &[Group]) -> String {
    let rows = groups
        .iter()
        .map(|g| vec![cell(g.object_id()), cell(g.object_href())])
        .collect();

    format_table(&["ID", "HREF"], rows)
}

pub fn format_user_list(users: &[User]) -> String {
    let rows = users.iter().map(|u| vec![cell(u.object_id())]).collect();
    format_table(&["ID"], rows)
}

// ============================================================================
// Service log display
// ============================================================================

pub fn format_log_entries(entries: &[LogEntry]) -> String {
    let headers = &["TIMESTAMP", "SEVERITY", "SERVICE", "SUMMARY"];
    let rows = entries
        .iter()
        .map(|e| {
            vec![
                timestamp(e.timestamp),
                cell(e.severity),
                cell(e.service_name.as_deref()),
                cell(e.summary.as_deref()),
            ]
        })
        .collect();

    format_table(headers, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::clusters_mgmt::{CloudRegion, ClusterState};
    use crate::model::service_logs::Severity;
    use chrono::TimeZone;

    #[test]
    fn test_format_table_empty() {
        let output = format_table(&["ID"], vec![]);
        assert_eq!(output, "No resources found.\n");
    }

    #[test]
    fn test_format_table_alignment() {
        let rows = vec![
            vec!["1".to_string(), "short".to_string()],
            vec!["22".to_string(), "a longer value".to_string()],
        ];
        let output = format_table(&["id", "name"], rows);
        let lines: Vec<_> = output.lines().collect();

        assert_eq!(lines[0], "ID   NAME");
        assert_eq!(lines[1], "1    short");
        assert_eq!(lines[2], "22   a longer value");
    }

    #[test]
    fn test_format_context_list() {
        let contexts = vec![
            ContextInfo {
                name: "local".to_string(),
                url: "http://localhost:8000".to_string(),
                is_current: true,
            },
            ContextInfo {
                name: "prod".to_string(),
                url: "https://api.openshift.com".to_string(),
                is_current: false,
            },
        ];

        let output = format_context_list(&contexts);
        assert!(output.contains("* "));
        assert!(output.contains("local"));
        assert!(output.contains("https://api.openshift.com"));
    }

    #[test]
    fn test_format_cluster_list() {
        let clusters = vec![Cluster::new()
            .id("123")
            .name("mycluster")
            .state(ClusterState::Ready)
            .openshift_version("4.15.10")
            .region(CloudRegion::link_to("us-east-1"))];

        let output = format_cluster_list(&clusters);
        let lines: Vec<_> = output.lines().collect();
        assert!(lines[0].starts_with("ID"));
        assert!(lines[1].contains("mycluster"));
        assert!(lines[1].contains("ready"));
        assert!(lines[1].contains("us-east-1"));
        assert!(lines[1].ends_with('-'));
    }

    #[test]
    fn test_format_cluster_detail() {
        let cluster = Cluster::new()
            .id("123")
            .name("mycluster")
            .creation_timestamp(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap());

        let output = format_cluster(&cluster);
        assert!(output.contains("ID:"));
        assert!(output.contains("mycluster"));
        assert!(output.contains("2024-03-01T10:00:00Z"));
        assert!(output.contains("Console URL:"));
    }

    #[test]
    fn test_format_log_entries() {
        let entries = vec![LogEntry::new()
            .severity(Severity::Warning)
            .service_name("ClusterLifecycle")
            .summary("Cluster deleted")];

        let output = format_log_entries(&entries);
        assert!(output.contains("Warning"));
        assert!(output.contains("Cluster deleted"));
    }

    #[test]
    fn test_format_page_summary() {
        assert_eq!(
            format_page_summary(10, 42).as_deref(),
            Some("Showing 10 of 42 items.\n")
        );
        assert!(format_page_summary(3, 3).is_none());
    }

    #[test]
    fn test_format_json() {
        let version = Version::new().id("openshift-v4.15.10").enabled(true);
        let output = format_json(&version).unwrap();
        assert!(output.contains("\"id\": \"openshift-v4.15.10\""));
        assert!(output.ends_with("}\n"));
    }
}
