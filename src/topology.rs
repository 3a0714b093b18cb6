// src/topology.rs

//! Topology input discovery.
//!
//! Topologies are GraphML files (Topology Zoo format) below a root
//! directory; only files named in the configured allow-list are used. Each
//! graph node becomes one emulated PoP.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, warn};

use crate::errors::Result;
use crate::fs::FileSystem;

pub const TOPOLOGY_EXTENSION: &str = "graphml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologySpec {
    /// File name, e.g. `Abilene.graphml`.
    pub name: String,
    pub path: PathBuf,
    /// Number of PoPs (graph nodes).
    pub pops: usize,
}

static NODE_ELEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<node[\s/>]").expect("static regex"));

/// Number of `<node>` elements in a GraphML document.
pub fn count_pops(graphml: &str) -> usize {
    NODE_ELEMENT.find_iter(graphml).count()
}

/// Walk `root` and return the allow-listed topology files, in allow-list order.
pub fn discover_topologies(
    fs: &dyn FileSystem,
    root: &Path,
    allow_list: &[String],
) -> Result<Vec<TopologySpec>> {
    let mut found = Vec::new();
    collect_graph_files(fs, root, &mut found)?;

    let mut topologies = Vec::new();
    for wanted in allow_list {
        let Some(path) = found
            .iter()
            .find(|p| p.file_name().and_then(|n| n.to_str()) == Some(wanted.as_str()))
        else {
            warn!(topology = %wanted, root = %root.display(), "topology not found; skipping");
            continue;
        };

        let contents = fs.read_to_string(path)?;
        topologies.push(TopologySpec {
            name: wanted.clone(),
            path: path.clone(),
            pops: count_pops(&contents),
        });
    }

    info!(count = topologies.len(), "topology files to be emulated");
    Ok(topologies)
}

fn collect_graph_files(fs: &dyn FileSystem, dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries = fs.read_dir(dir)?;
    entries.sort();
    for entry in entries {
        if fs.is_dir(&entry) {
            collect_graph_files(fs, &entry, out)?;
        } else if entry.extension().and_then(|e| e.to_str()) == Some(TOPOLOGY_EXTENSION) {
            out.push(entry);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    const ABILENE: &str = r#"<graphml><graph>
<node id="0"><data key="d1">NY</data></node>
<node id="1"/>
<node id="2">
<edge source="0" target="1"/>
<nodes-not-a-node/>
</graph></graphml>"#;

    #[test]
    fn counts_node_elements_only() {
        assert_eq!(count_pops(ABILENE), 3);
        assert_eq!(count_pops(""), 0);
    }

    #[test]
    fn discovers_allow_listed_files_recursively() {
        let fs = MockFileSystem::new();
        fs.add_file("zoo/Abilene.graphml", ABILENE);
        fs.add_file("zoo/sub/Geant2012.graphml", "<node id=\"a\"/>");
        fs.add_file("zoo/Unwanted.graphml", "<node/>");
        fs.add_file("zoo/README.md", "Abilene.graphml");

        let allow = vec!["Geant2012.graphml".to_string(), "Abilene.graphml".to_string()];
        let topos = discover_topologies(&fs, Path::new("zoo"), &allow).unwrap();

        assert_eq!(topos.len(), 2);
        assert_eq!(topos[0].name, "Geant2012.graphml");
        assert_eq!(topos[0].pops, 1);
        assert_eq!(topos[1].name, "Abilene.graphml");
        assert_eq!(topos[1].pops, 3);
    }

    #[test]
    fn missing_topology_is_skipped() {
        let fs = MockFileSystem::new();
        fs.add_file("zoo/Abilene.graphml", ABILENE);
        let allow = vec!["Nope.graphml".to_string()];
        assert!(discover_topologies(&fs, Path::new("zoo"), &allow).unwrap().is_empty());
    }
}
