//! Orchestrator sync-path properties: idempotence, category isolation,
//! guard exclusivity, HP direction, sweep counting and reporting.

use std::sync::Arc;

use hordebond_core::{registry, EntityId, EntityStore, Skill, StatSelector, SyncOptions, UserId};
use hordebond_engine::Orchestrator;
use hordebond_harness::{Level, MemoryHost, RecordingNotifier};

fn gm() -> UserId {
    UserId::from("gm")
}

fn summoner() -> EntityId {
    EntityId::from("summoner-01")
}

fn horde() -> EntityId {
    EntityId::from("horde-01")
}

fn fixture() -> (Arc<MemoryHost>, Arc<RecordingNotifier>, Orchestrator) {
    let host = Arc::new(MemoryHost::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let orchestrator = Orchestrator::new(host.clone(), notifier.clone(), gm());
    (host, notifier, orchestrator)
}

fn ac_only() -> SyncOptions {
    SyncOptions {
        ac: true,
        saves: false,
        skills: false,
        hp: false,
    }
}

#[test]
fn linking_mirrors_the_summoner_ac() {
    let (host, _, orchestrator) = fixture();
    host.add_summoner(&summoner()).stat(StatSelector::Ac, 19).commit();
    host.add_horde(&horde()).stat(StatSelector::Ac, 12).commit();

    assert!(orchestrator.link_horde(&summoner(), &horde(), Some(ac_only())));

    let bond = registry::find_bond(host.as_ref(), &horde()).expect("bond");
    assert_eq!(bond.applied_offset(StatSelector::Ac), 7);
    assert_eq!(host.effective_value(&horde(), StatSelector::Ac), Some(19));
    assert!(bond.last_synced.is_some(), "first sync stamps the bond");
}

#[test]
fn repeated_sync_yields_the_same_modifier_set() {
    let (host, _, orchestrator) = fixture();
    host.add_summoner(&summoner()).stat(StatSelector::Ac, 19).commit();
    host.add_horde(&horde()).stat(StatSelector::Ac, 12).commit();
    assert!(orchestrator.link_horde(&summoner(), &horde(), Some(ac_only())));

    let first = registry::find_bond(host.as_ref(), &horde()).expect("bond");

    let mut events = host.subscribe();
    assert!(orchestrator.sync_summoner_to_horde(&summoner(), &horde()));
    let second = registry::find_bond(host.as_ref(), &horde()).expect("bond");

    assert_eq!(second, first, "offset stays 7, never compounds to 14");
    assert_eq!(host.effective_value(&horde(), StatSelector::Ac), Some(19));
    assert!(
        events.try_recv().is_err(),
        "a no-op sync must not touch the store at all"
    );
}

#[test]
fn sync_tracks_a_changed_summoner() {
    let (host, _, orchestrator) = fixture();
    host.add_summoner(&summoner()).stat(StatSelector::Ac, 19).commit();
    host.add_horde(&horde()).stat(StatSelector::Ac, 12).commit();
    assert!(orchestrator.link_horde(&summoner(), &horde(), Some(ac_only())));

    host.edit_stat(&gm(), &summoner(), StatSelector::Ac, 21);
    assert!(orchestrator.sync_summoner_to_horde(&summoner(), &horde()));

    let bond = registry::find_bond(host.as_ref(), &horde()).expect("bond");
    assert_eq!(bond.applied_offset(StatSelector::Ac), 9);
    assert_eq!(host.effective_value(&horde(), StatSelector::Ac), Some(21));
}

#[test]
fn disabling_a_category_retroactively_clears_its_rules() {
    let (host, _, orchestrator) = fixture();
    host.add_summoner(&summoner())
        .stat(StatSelector::Ac, 19)
        .stat(StatSelector::Fortitude, 11)
        .stat(StatSelector::Skill(Skill::Stealth), 8)
        .hp(30, 0, 30)
        .commit();
    host.add_horde(&horde())
        .stat(StatSelector::Ac, 12)
        .stat(StatSelector::Fortitude, 6)
        .stat(StatSelector::Skill(Skill::Stealth), 2)
        .hp(20, 0, 20)
        .commit();

    assert!(orchestrator.link_horde(&summoner(), &horde(), None));
    let full = registry::find_bond(host.as_ref(), &horde()).expect("bond");
    assert_eq!(full.rules.len(), 21, "every category enabled by default");
    assert_eq!(full.applied_offset(StatSelector::Skill(Skill::Stealth)), 6);

    // Re-link with skills off; the next sync rebuilds the rule list.
    let narrowed = SyncOptions {
        skills: false,
        ..SyncOptions::default()
    };
    assert!(orchestrator.link_horde(&summoner(), &horde(), Some(narrowed)));

    let bond = registry::find_bond(host.as_ref(), &horde()).expect("bond");
    assert_eq!(bond.rules.len(), 5, "ac + 3 saves + max hp remain");
    assert!(
        !bond.rules.iter().any(|r| matches!(r.selector, StatSelector::Skill(_))),
        "skill rules removed, not frozen"
    );
    assert_eq!(bond.applied_offset(StatSelector::Ac), 7, "ac untouched");
    assert_eq!(bond.applied_offset(StatSelector::Fortitude), 5, "saves untouched");
    assert_eq!(bond.applied_offset(StatSelector::MaxHp), 10, "hp untouched");
}

#[test]
fn guarded_horde_refuses_a_concurrent_sync() {
    let (host, _, orchestrator) = fixture();
    host.add_summoner(&summoner()).stat(StatSelector::Ac, 19).commit();
    host.add_horde(&horde()).stat(StatSelector::Ac, 12).commit();
    assert!(orchestrator.link_horde(&summoner(), &horde(), Some(ac_only())));
    host.edit_stat(&gm(), &summoner(), StatSelector::Ac, 25);

    let before = registry::find_bond(host.as_ref(), &horde()).expect("bond");
    let held = orchestrator.begin_sync(&horde()).expect("hold the horde");

    assert!(
        !orchestrator.sync_summoner_to_horde(&summoner(), &horde()),
        "in-flight horde must drop the second attempt"
    );
    let after = registry::find_bond(host.as_ref(), &horde()).expect("bond");
    assert_eq!(after, before, "refused sync must not mutate the horde");

    drop(held);
    assert!(orchestrator.sync_summoner_to_horde(&summoner(), &horde()));
    let synced = registry::find_bond(host.as_ref(), &horde()).expect("bond");
    assert_eq!(synced.applied_offset(StatSelector::Ac), 13);
}

#[test]
fn forward_sync_copies_current_and_temp_hp() {
    let (host, _, orchestrator) = fixture();
    host.add_summoner(&summoner()).hp(31, 2, 40).commit();
    host.add_horde(&horde()).hp(10, 0, 25).commit();

    assert!(orchestrator.link_horde(&summoner(), &horde(), None));

    let hp = host.hp(&horde()).expect("horde hp");
    assert_eq!((hp.value, hp.temp), (31, 2), "current/temp mirrored directly");
    assert_eq!(hp.max, 40, "max reached via the +15 bond offset");
}

#[test]
fn horde_damage_flows_back_without_touching_summoner_max() {
    let (host, _, orchestrator) = fixture();
    host.add_summoner(&summoner()).hp(40, 0, 40).commit();
    host.add_horde(&horde()).hp(10, 0, 40).commit();
    assert!(orchestrator.link_horde(&summoner(), &horde(), None));

    // The shared pool takes a hit on the horde's side.
    host.damage(&gm(), &horde(), 22, 3);
    assert!(orchestrator.sync_horde_to_summoner(&horde(), &summoner()));

    let hp = host.hp(&summoner()).expect("summoner hp");
    assert_eq!((hp.value, hp.temp), (22, 3));
    assert_eq!(hp.max, 40, "summoner stays the source of truth for max");
}

#[test]
fn hp_disabled_link_refuses_the_back_sync() {
    let (host, _, orchestrator) = fixture();
    host.add_summoner(&summoner()).hp(40, 0, 40).commit();
    host.add_horde(&horde()).hp(40, 0, 40).commit();
    let no_hp = SyncOptions {
        hp: false,
        ..SyncOptions::default()
    };
    assert!(orchestrator.link_horde(&summoner(), &horde(), Some(no_hp)));

    host.damage(&gm(), &horde(), 5, 0);
    assert!(!orchestrator.sync_horde_to_summoner(&horde(), &summoner()));
    let hp = host.hp(&summoner()).expect("summoner hp");
    assert_eq!(hp.value, 40, "disabled hp category must block the copy");
}

#[test]
fn guarded_summoner_refuses_the_back_sync() {
    let (host, _, orchestrator) = fixture();
    host.add_summoner(&summoner()).hp(40, 0, 40).commit();
    host.add_horde(&horde()).hp(40, 0, 40).commit();
    assert!(orchestrator.link_horde(&summoner(), &horde(), None));

    host.damage(&gm(), &horde(), 12, 0);
    let _held = orchestrator.begin_sync(&summoner()).expect("hold the summoner");
    assert!(!orchestrator.sync_horde_to_summoner(&horde(), &summoner()));
    assert_eq!(host.hp(&summoner()).expect("hp").value, 40);
}

#[test]
fn store_rejection_degrades_to_a_reported_false() {
    let (host, notifier, orchestrator) = fixture();
    host.add_summoner(&summoner()).stat(StatSelector::Ac, 19).commit();
    host.add_horde(&horde()).stat(StatSelector::Ac, 12).commit();
    assert!(orchestrator.link_horde(&summoner(), &horde(), Some(ac_only())));

    host.edit_stat(&gm(), &summoner(), StatSelector::Ac, 23);
    host.set_fail_writes(true);

    assert!(!orchestrator.sync_summoner_to_horde(&summoner(), &horde()));
    assert!(notifier.contains(Level::Error, "Failed to sync"));
    assert!(
        !orchestrator.is_syncing(&horde()),
        "guard must release on the failure path"
    );

    host.set_fail_writes(false);
    assert!(orchestrator.sync_summoner_to_horde(&summoner(), &horde()));
}

#[test]
fn sync_all_fans_out_once_per_summoner() {
    let (host, notifier, orchestrator) = fixture();
    host.add_summoner(&summoner()).stat(StatSelector::Ac, 19).commit();
    for name in ["horde-01", "horde-02", "horde-03"] {
        host.add_horde(&EntityId::from(name)).stat(StatSelector::Ac, 12).commit();
        assert!(orchestrator.link_horde(&summoner(), &EntityId::from(name), Some(ac_only())));
    }
    host.edit_stat(&gm(), &summoner(), StatSelector::Ac, 20);
    notifier.clear();

    assert_eq!(orchestrator.sync_all(), 3);
    assert!(notifier.contains(Level::Info, "Synced 3"));
    for name in ["horde-01", "horde-02", "horde-03"] {
        assert_eq!(
            host.effective_value(&EntityId::from(name), StatSelector::Ac),
            Some(20)
        );
    }
}

#[test]
fn sync_all_reports_the_zero_outcome_distinctly() {
    let (host, notifier, orchestrator) = fixture();
    host.add_summoner(&summoner()).commit();
    assert_eq!(orchestrator.sync_all(), 0);
    assert!(notifier.contains(Level::Info, "No linked hordes"));
}

#[test]
fn sync_all_skips_hordes_the_user_cannot_modify() {
    let (host, _, orchestrator) = fixture();
    host.add_summoner(&summoner()).stat(StatSelector::Ac, 19).commit();
    host.add_horde(&EntityId::from("mine")).stat(StatSelector::Ac, 12).commit();
    host.add_horde(&EntityId::from("theirs"))
        .stat(StatSelector::Ac, 12)
        .owned_by(&UserId::from("player-2"))
        .commit();
    assert!(orchestrator.link_horde(&summoner(), &EntityId::from("mine"), Some(ac_only())));
    host.install_bond(
        &EntityId::from("theirs"),
        &registry::find_bond(host.as_ref(), &EntityId::from("mine")).expect("template bond"),
    );

    host.edit_stat(&gm(), &summoner(), StatSelector::Ac, 24);
    assert_eq!(orchestrator.sync_all(), 1, "only the modifiable horde syncs");
    assert_eq!(
        host.effective_value(&EntityId::from("theirs"), StatSelector::Ac),
        Some(19),
        "unowned horde left alone"
    );
}

#[test]
fn initial_sync_reconciles_silently() {
    let (host, notifier, orchestrator) = fixture();
    host.add_summoner(&summoner()).stat(StatSelector::Ac, 19).commit();
    host.add_horde(&horde()).stat(StatSelector::Ac, 12).commit();
    assert!(orchestrator.link_horde(&summoner(), &horde(), Some(ac_only())));

    // Drift accumulated while nothing was listening.
    host.edit_stat(&gm(), &summoner(), StatSelector::Ac, 22);
    notifier.clear();

    orchestrator.initial_sync();
    assert!(notifier.is_empty(), "initial sync must not notify");
    assert_eq!(host.effective_value(&horde(), StatSelector::Ac), Some(22));
}

#[test]
fn all_disabled_options_write_an_empty_rule_list() {
    let (host, _, orchestrator) = fixture();
    host.add_summoner(&summoner()).stat(StatSelector::Ac, 19).commit();
    host.add_horde(&horde()).stat(StatSelector::Ac, 12).commit();
    assert!(orchestrator.link_horde(&summoner(), &horde(), Some(ac_only())));
    assert!(!registry::find_bond(host.as_ref(), &horde()).expect("bond").rules.is_empty());

    let none = SyncOptions {
        ac: false,
        saves: false,
        skills: false,
        hp: false,
    };
    assert!(orchestrator.link_horde(&summoner(), &horde(), Some(none)));

    let bond = registry::find_bond(host.as_ref(), &horde()).expect("bond");
    assert!(bond.rules.is_empty(), "previous offsets cleared, not frozen");
    assert_eq!(host.effective_value(&horde(), StatSelector::Ac), Some(12));
}
