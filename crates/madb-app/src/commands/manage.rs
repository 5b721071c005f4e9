//! `name`, `group` and `user`: editing the persistent config
//!
//! Each operation is one read-modify-write of the config file. Nothing here
//! talks to adb.

use std::collections::BTreeMap;

use tabled::settings::{Alignment, Style};
use tabled::{Table, Tabled};

use madb_core::prelude::*;

use super::CommandContext;

#[derive(Debug, Tabled)]
struct NameRow {
    #[tabled(rename = "Serial")]
    serial: String,
    #[tabled(rename = "Nickname")]
    nickname: String,
}

#[derive(Debug, Tabled)]
struct GroupRow {
    #[tabled(rename = "Group Name")]
    group: String,
    #[tabled(rename = "Members")]
    members: String,
}

#[derive(Debug, Tabled)]
struct UserRow {
    #[tabled(rename = "Device Serial")]
    serial: String,
    #[tabled(rename = "User ID")]
    user_id: String,
}

fn render_table<R: Tabled>(rows: Vec<R>) -> String {
    Table::new(rows)
        .with(Style::psql())
        .with(Alignment::left())
        .to_string()
}

fn print_table<R: Tabled>(ctx: &CommandContext, rows: Vec<R>) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    ctx.println(render_table(rows))
}

/// One row per nickname, in nickname order
fn name_rows(names: &BTreeMap<String, String>) -> Vec<NameRow> {
    names
        .iter()
        .map(|(nickname, serial)| NameRow {
            serial: serial.clone(),
            nickname: nickname.clone(),
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────
// Nicknames
// ─────────────────────────────────────────────────────────────────

/// `madb name set <serial> <nickname>`
pub fn name_set(ctx: &CommandContext, serial: &str, nickname: &str) -> Result<()> {
    ctx.store.update(|cfg| cfg.set_nickname(serial, nickname))?;
    info!("Nicknamed {} as {}", serial, nickname);
    Ok(())
}

/// `madb name unset <serial|nickname>`
pub fn name_unset(ctx: &CommandContext, name: &str) -> Result<()> {
    ctx.store.update(|cfg| cfg.unset_nickname(name))
}

/// `madb name list`
pub fn name_list(ctx: &CommandContext) -> Result<()> {
    let cfg = ctx.store.read()?;
    print_table(ctx, name_rows(&cfg.names))
}

/// `madb name clear-all`
pub fn name_clear_all(ctx: &CommandContext) -> Result<()> {
    ctx.store.update(|cfg| {
        cfg.clear_nicknames();
        Ok(())
    })
}

// ─────────────────────────────────────────────────────────────────
// Groups
// ─────────────────────────────────────────────────────────────────

/// `madb group add <group> <member>...`
pub fn group_add(ctx: &CommandContext, group: &str, members: &[String]) -> Result<()> {
    ctx.store.update(|cfg| cfg.add_group_members(group, members))
}

/// `madb group remove <group> <member>...`
pub fn group_remove(ctx: &CommandContext, group: &str, members: &[String]) -> Result<()> {
    ctx.store.update(|cfg| cfg.remove_group_members(group, members))
}

/// `madb group delete <group>...`
pub fn group_delete(ctx: &CommandContext, groups: &[String]) -> Result<()> {
    ctx.store.update(|cfg| cfg.delete_groups(groups))
}

/// `madb group rename <old> <new>`
pub fn group_rename(ctx: &CommandContext, old_name: &str, new_name: &str) -> Result<()> {
    ctx.store.update(|cfg| cfg.rename_group(old_name, new_name))
}

/// `madb group list`
pub fn group_list(ctx: &CommandContext) -> Result<()> {
    let cfg = ctx.store.read()?;
    let rows = cfg
        .groups
        .iter()
        .map(|(group, members)| GroupRow {
            group: group.clone(),
            members: members.join(" "),
        })
        .collect();
    print_table(ctx, rows)
}

/// `madb group clear-all`
pub fn group_clear_all(ctx: &CommandContext) -> Result<()> {
    ctx.store.update(|cfg| {
        cfg.clear_groups();
        Ok(())
    })
}

// ─────────────────────────────────────────────────────────────────
// Default user ids
// ─────────────────────────────────────────────────────────────────

/// `madb user set <serial> <user_id>`
pub fn user_set(ctx: &CommandContext, serial: &str, user_id: &str) -> Result<()> {
    ctx.store.update(|cfg| cfg.set_user_id(serial, user_id))
}

/// `madb user unset <serial>`
pub fn user_unset(ctx: &CommandContext, serial: &str) -> Result<()> {
    ctx.store.update(|cfg| cfg.unset_user_id(serial))
}

/// `madb user list`
pub fn user_list(ctx: &CommandContext) -> Result<()> {
    let cfg = ctx.store.read()?;
    let rows = cfg
        .user_ids
        .iter()
        .map(|(serial, user_id)| UserRow {
            serial: serial.clone(),
            user_id: user_id.clone(),
        })
        .collect();
    print_table(ctx, rows)
}

/// `madb user clear-all`
pub fn user_clear_all(ctx: &CommandContext) -> Result<()> {
    ctx.store.update(|cfg| {
        cfg.clear_user_ids();
        Ok(())
    })
}
