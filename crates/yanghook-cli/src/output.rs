//! Output formatting helpers.

use colored::Colorize;

use yanghook_core::{Stream, StreamList};
use yanghook_restconf::ServerState;
use yanghook_restconf::state::{Actionpoint, Callpoint, Datastore};

/// Print an error message.
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print the advertised streams as a table.
pub fn stream_table(list: &StreamList) {
    if list.count() == 0 {
        println!("no event streams advertised");
        return;
    }

    let name_width = list
        .streams
        .iter()
        .map(|s| s.name.len())
        .max()
        .unwrap_or(0)
        .max("NAME".len());

    // Pad before colorizing so the escape codes don't skew the columns.
    let header = format!("{:<name_width$}  {:<6}  {:<10}  DESCRIPTION", "NAME", "REPLAY", "ENCODINGS");
    println!("{}", header.bold());
    for stream in &list.streams {
        let replay = if stream.replay_support { "yes" } else { "no" };
        let encodings = stream
            .access
            .iter()
            .map(|a| a.encoding.to_string())
            .collect::<Vec<_>>()
            .join(",");
        println!(
            "{:<name_width$}  {:<6}  {:<10}  {}",
            stream.name,
            replay,
            encodings,
            stream.description.dimmed(),
        );
    }
}

/// Print a one-line summary of a stream and its attached webhooks.
pub fn stream_summary(stream: &Stream) {
    let hooks = stream.webhooks.len();
    println!(
        "{} {} ({} webhook{})",
        "→".green(),
        stream.name.bold(),
        hooks,
        plural(hooks),
    );
    for hook in &stream.webhooks {
        let flag = if hook.disable {
            " [DISABLED]".red().to_string()
        } else {
            String::new()
        };
        println!("    {}{}", hook.url.dimmed(), flag);
    }
}

/// Print the loaded data models, optionally with mount detail.
pub fn model_table(state: &ServerState, show_mounts: bool) {
    if state.models.is_empty() {
        println!("no loaded data models");
        return;
    }

    let name_width = column_width(state.models.iter().map(|m| m.name.as_str()), "NAME");
    let prefix_width = column_width(state.models.iter().map(|m| m.prefix.as_str()), "PREFIX");
    let header = format!(
        "{:<name_width$}  {:<prefix_width$}  {:<10}  NAMESPACE",
        "NAME", "PREFIX", "REVISION"
    );
    println!("{}", header.bold());
    for model in &state.models {
        println!(
            "{:<name_width$}  {:<prefix_width$}  {:<10}  {}",
            model.name,
            model.prefix,
            model.revision,
            model.namespace.dimmed(),
        );
        if show_mounts {
            for mount in &state.mounts {
                if mount.models.iter().any(|m| m.name == model.name) {
                    println!("    {} mount {}", "→".cyan(), mount.id);
                }
            }
        }
    }
    println!(
        "\n{} loaded data model{}",
        state.models.len(),
        plural(state.models.len()),
    );
}

/// Print the CDB datastores.
pub fn datastore_table(datastores: &[Datastore]) {
    if datastores.is_empty() {
        println!("no datastores");
        return;
    }

    let name_width = column_width(datastores.iter().map(|d| d.name.as_str()), "NAME");
    let header = format!(
        "{:<name_width$}  {:<12}  {:<12}  FILENAME",
        "NAME", "RAM SIZE", "DISK SIZE"
    );
    println!("{}", header.bold());
    for datastore in datastores {
        println!(
            "{:<name_width$}  {:<12}  {:<12}  {}",
            datastore.name,
            datastore.ram_size,
            datastore.disk_size,
            datastore.filename.dimmed(),
        );
    }
    println!("\n{} datastore{}", datastores.len(), plural(datastores.len()));
}

/// Print the registered callpoints, with unregistered ones flagged.
pub fn callpoint_table(callpoints: &[Callpoint]) {
    if callpoints.is_empty() {
        println!("no callpoints");
        return;
    }

    let id_width = column_width(callpoints.iter().map(|c| c.id.as_str()), "ID");
    let daemon_width = column_width(callpoints.iter().map(|c| c.daemon.as_str()), "DAEMON");
    let header = format!("{:<id_width$}  {:<daemon_width$}  CALLBACKS", "ID", "DAEMON");
    println!("{}", header.bold());
    let mut errors = Vec::new();
    for point in callpoints {
        let line = format!(
            "{:<id_width$}  {:<daemon_width$}  {}",
            point.id,
            point.daemon,
            point.callbacks.join(","),
        );
        if point.error.is_some() {
            println!("{}", line.red());
            errors.push(point);
        } else {
            println!("{}", line);
        }
    }
    if !errors.is_empty() {
        println!("\n{}", "Errors:".bold());
        for point in errors {
            println!(
                "{:<id_width$}  {}",
                point.id,
                point.error.as_deref().unwrap_or("").red(),
            );
        }
    }
    println!("\n{} callpoint{}", callpoints.len(), plural(callpoints.len()));
}

/// Print the registered actionpoints.
pub fn actionpoint_table(actionpoints: &[Actionpoint]) {
    if actionpoints.is_empty() {
        println!("no actionpoints");
        return;
    }

    let id_width = column_width(actionpoints.iter().map(|a| a.id.as_str()), "ID");
    let daemon_width = column_width(actionpoints.iter().map(|a| a.daemon.as_str()), "DAEMON");
    let header = format!("{:<id_width$}  {:<daemon_width$}  CALLBACKS", "ID", "DAEMON");
    println!("{}", header.bold());
    for point in actionpoints {
        println!(
            "{:<id_width$}  {:<daemon_width$}  {}",
            point.id,
            point.daemon,
            point.callbacks.join(","),
        );
    }
    println!(
        "\n{} actionpoint{}",
        actionpoints.len(),
        plural(actionpoints.len()),
    );
}

fn column_width<'a>(values: impl Iterator<Item = &'a str>, header: &str) -> usize {
    values.map(str::len).max().unwrap_or(0).max(header.len())
}

pub fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}
