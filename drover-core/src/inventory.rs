//! Inventory parsing: the hosts-and-groups file.
//!
//! An ini-like format: optional `[group]` headers, one host per line with
//! optional `key=value` settings, `#` or `;` comments. A host may appear
//! in several groups; the first occurrence fixes its settings and its
//! position in the run order.
//!
//! ```text
//! web-01 user=deploy
//! web-02 user=deploy port=2222
//!
//! [db]
//! db-01 user=postgres password=secret
//! ```

// Layer 1: Standard library
use std::collections::BTreeMap;
use std::path::Path;

// Layer 2: Third-party
use drover_shell::HostSpec;

// Layer 3: Internal
use crate::error::EngineError;

/// A parsed inventory: ordered hosts plus group membership.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    hosts: Vec<HostSpec>,
    groups: BTreeMap<String, Vec<String>>,
    name: String,
}

impl Inventory {
    /// Parse inventory text. `name` labels the inventory in sessions.
    pub fn parse(name: impl Into<String>, text: &str) -> Result<Self, EngineError> {
        let name = name.into();
        let mut hosts: Vec<HostSpec> = Vec::new();
        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut current_group: Option<String> = None;

        for (line_number, raw_line) in text.lines().enumerate() {
            let line = strip_comment(raw_line).trim();
            if line.is_empty() {
                continue;
            }

            if let Some(group) = line.strip_prefix('[') {
                let Some(group) = group.strip_suffix(']') else {
                    return Err(EngineError::inventory(
                        &name,
                        format!("line {}: unterminated group header", line_number + 1),
                    ));
                };
                let group = group.trim().to_string();
                if group.is_empty() {
                    return Err(EngineError::inventory(
                        &name,
                        format!("line {}: empty group name", line_number + 1),
                    ));
                }
                groups.entry(group.clone()).or_default();
                current_group = Some(group);
                continue;
            }

            let host = parse_host(line, &name, line_number + 1)?;
            if let Some(group) = &current_group {
                let members = groups.entry(group.clone()).or_default();
                if !members.contains(&host.hostname) {
                    members.push(host.hostname.clone());
                }
            }
            // Duplicate hostnames collapse to the first occurrence.
            if !hosts.iter().any(|known| known.hostname == host.hostname) {
                hosts.push(host);
            }
        }

        Ok(Self {
            hosts,
            groups,
            name,
        })
    }

    /// Load an inventory file; the file name becomes the inventory name.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let text = std::fs::read_to_string(path)
            .map_err(|error| EngineError::inventory(path.display().to_string(), error.to_string()))?;
        Self::parse(name, &text)
    }

    /// All hosts in declaration order.
    pub fn hosts(&self) -> &[HostSpec] {
        &self.hosts
    }

    /// Hosts of one group, in group declaration order.
    pub fn group(&self, group: &str) -> Option<Vec<&HostSpec>> {
        let members = self.groups.get(group)?;
        Some(
            members
                .iter()
                .filter_map(|hostname| self.hosts.iter().find(|host| &host.hostname == hostname))
                .collect(),
        )
    }

    /// Known group names.
    pub fn group_names(&self) -> Vec<&str> {
        self.groups.keys().map(String::as_str).collect()
    }

    /// Inventory label used in session attributes.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fill in `password` on every host that has none (`--ask-pass`).
    pub fn apply_default_password(&mut self, password: &str) {
        for host in &mut self.hosts {
            if host.password.is_none() {
                host.password = Some(password.to_string());
            }
        }
    }

    /// Number of hosts.
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// True when no hosts were declared.
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find(['#', ';']) {
        Some(position) => &line[..position],
        None => line,
    }
}

fn parse_host(line: &str, inventory: &str, line_number: usize) -> Result<HostSpec, EngineError> {
    let mut parts = line.split_whitespace();
    let hostname = parts.next().unwrap_or_default();
    let mut host = HostSpec::new(hostname);

    for part in parts {
        let Some((key, value)) = part.split_once('=') else {
            return Err(EngineError::inventory(
                inventory,
                format!("line {line_number}: expected key=value, got '{part}'"),
            ));
        };
        match key {
            "user" => host.user = value.to_string(),
            "port" => {
                host.port = value.parse().map_err(|_| {
                    EngineError::inventory(
                        inventory,
                        format!("line {line_number}: bad port '{value}'"),
                    )
                })?;
            }
            "password" => host.password = Some(value.to_string()),
            other => {
                return Err(EngineError::inventory(
                    inventory,
                    format!("line {line_number}: unknown setting '{other}'"),
                ));
            }
        }
    }

    Ok(host)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
# front line
web-01 user=deploy
web-02 user=deploy port=2222

[db]
db-01 user=postgres password=secret  ; the only database

[all]
web-01
db-01
"#;

    #[test]
    fn test_parse_hosts_in_order() {
        let inventory = Inventory::parse("hosts.ini", SAMPLE).unwrap();
        let names: Vec<&str> = inventory
            .hosts()
            .iter()
            .map(|host| host.hostname.as_str())
            .collect();
        assert_eq!(names, vec!["web-01", "web-02", "db-01"]);
    }

    #[test]
    fn test_host_settings() {
        let inventory = Inventory::parse("hosts.ini", SAMPLE).unwrap();
        let web_02 = &inventory.hosts()[1];
        assert_eq!(web_02.user, "deploy");
        assert_eq!(web_02.port, 2222);

        let db_01 = &inventory.hosts()[2];
        assert_eq!(db_01.password.as_deref(), Some("secret"));
    }

    #[test]
    fn test_groups() {
        let inventory = Inventory::parse("hosts.ini", SAMPLE).unwrap();
        assert_eq!(inventory.group_names(), vec!["all", "db"]);

        let db = inventory.group("db").unwrap();
        assert_eq!(db.len(), 1);
        assert_eq!(db[0].hostname, "db-01");

        let all = inventory.group("all").unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_duplicate_host_keeps_first_settings() {
        let inventory = Inventory::parse(
            "hosts.ini",
            "web-01 user=first\n[again]\nweb-01 user=second\n",
        )
        .unwrap();
        assert_eq!(inventory.len(), 1);
        assert_eq!(inventory.hosts()[0].user, "first");
    }

    #[test]
    fn test_bad_setting_rejected() {
        assert!(Inventory::parse("hosts.ini", "web-01 flavor=mint\n").is_err());
        assert!(Inventory::parse("hosts.ini", "web-01 port=huge\n").is_err());
    }

    #[test]
    fn test_unterminated_group() {
        assert!(Inventory::parse("hosts.ini", "[db\n").is_err());
    }
}
