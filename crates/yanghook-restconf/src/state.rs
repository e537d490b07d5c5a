//! Server state inventory.
//!
//! The monitoring tree exposes the server version, the loaded data
//! models (including models mounted for managed devices), the CDB
//! datastores, and the registered callpoints and actionpoints. The
//! inventory is informational; nothing in the subscription path depends
//! on it.

use yanghook_core::Result;

use crate::xml;

/// One loaded YANG data model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataModel {
    pub name: String,
    pub revision: String,
    pub namespace: String,
    pub prefix: String,
}

/// One schema mount point and the models it carries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mount {
    pub id: String,
    pub models: Vec<DataModel>,
}

/// One CDB datastore.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Datastore {
    pub name: String,
    pub filename: String,
    pub ram_size: String,
    pub disk_size: String,
}

/// One registered callpoint. A callpoint with no registered daemon
/// carries an error string instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Callpoint {
    pub id: String,
    pub daemon: String,
    pub callbacks: Vec<String>,
    pub error: Option<String>,
}

/// One registered actionpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actionpoint {
    pub id: String,
    pub daemon: String,
    pub callbacks: Vec<String>,
}

/// Snapshot of the server's monitoring state.
#[derive(Clone, Debug, Default)]
pub struct ServerState {
    pub version: String,
    pub models: Vec<DataModel>,
    pub mounts: Vec<Mount>,
    pub datastores: Vec<Datastore>,
    pub callpoints: Vec<Callpoint>,
    pub actionpoints: Vec<Actionpoint>,
}

impl ServerState {
    /// Parse an ncs-state document.
    ///
    /// Models referenced only by a mount are folded into the top-level
    /// model list, so [`models`](Self::models) is the complete set.
    pub fn parse(body: &str) -> Result<Self> {
        let mut state = ServerState {
            version: xml::find_text(body, "version")?.unwrap_or("").to_string(),
            ..Default::default()
        };

        if let Some(loaded) = xml::find_element(body, "loaded-data-models")? {
            for model_xml in xml::find_children(loaded, "data-model")? {
                state.models.push(parse_model(model_xml)?);
            }
            for mount_xml in xml::find_children(loaded, "mount")? {
                let mut mount = Mount {
                    id: xml::find_text(mount_xml, "mount-id")?.unwrap_or("").to_string(),
                    models: Vec::new(),
                };
                for model_xml in xml::find_children(mount_xml, "data-model")? {
                    mount.models.push(parse_model(model_xml)?);
                }
                state.mounts.push(mount);
            }
        }

        // Mount expansion: models seen only under a mount join the list
        for mount in &state.mounts {
            for model in &mount.models {
                if !state.models.iter().any(|m| m.name == model.name) {
                    state.models.push(model.clone());
                }
            }
        }

        if let Some(internal) = xml::find_element(body, "internal")? {
            if let Some(cdb) = xml::find_element(internal, "cdb")? {
                for datastore_xml in xml::find_children(cdb, "datastore")? {
                    state.datastores.push(Datastore {
                        name: xml::find_text(datastore_xml, "name")?.unwrap_or("").to_string(),
                        filename: xml::find_text(datastore_xml, "filename")?
                            .unwrap_or("")
                            .to_string(),
                        ram_size: xml::find_text(datastore_xml, "ram-size")?
                            .unwrap_or("")
                            .to_string(),
                        disk_size: xml::find_text(datastore_xml, "disk-size")?
                            .unwrap_or("")
                            .to_string(),
                    });
                }
            }
            if let Some(callpoints) = xml::find_element(internal, "callpoints")? {
                for cp_xml in xml::find_children(callpoints, "callpoint")? {
                    let (daemon, callbacks) = parse_daemon(cp_xml)?;
                    state.callpoints.push(Callpoint {
                        id: xml::find_text(cp_xml, "id")?.unwrap_or("").to_string(),
                        daemon,
                        callbacks,
                        error: xml::find_text(cp_xml, "error")?.map(str::to_string),
                    });
                }
                for ap_xml in xml::find_children(callpoints, "actionpoint")? {
                    let (daemon, callbacks) = parse_daemon(ap_xml)?;
                    state.actionpoints.push(Actionpoint {
                        id: xml::find_text(ap_xml, "id")?.unwrap_or("").to_string(),
                        daemon,
                        callbacks,
                    });
                }
            }
        }

        Ok(state)
    }
}

fn parse_model(model_xml: &str) -> Result<DataModel> {
    Ok(DataModel {
        name: xml::find_text(model_xml, "name")?.unwrap_or("").to_string(),
        revision: xml::find_text(model_xml, "revision")?.unwrap_or("").to_string(),
        namespace: xml::find_text(model_xml, "namespace")?.unwrap_or("").to_string(),
        prefix: xml::find_text(model_xml, "prefix")?.unwrap_or("").to_string(),
    })
}

fn parse_daemon(point_xml: &str) -> Result<(String, Vec<String>)> {
    let Some(daemon_xml) = xml::find_element(point_xml, "daemon")? else {
        return Ok((String::new(), Vec::new()));
    };
    let name = xml::find_text(daemon_xml, "name")?.unwrap_or("").to_string();
    let callbacks = xml::find_children(daemon_xml, "callbacks")?
        .iter()
        .map(|c| c.trim().to_string())
        .collect();
    Ok((name, callbacks))
}
