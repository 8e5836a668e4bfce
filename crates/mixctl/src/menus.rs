//! Menu builders for each row family.  The choice sets depend on the title
//! flags and the player mode, so menus are rebuilt on every render of their
//! family.

use mixctl_proto::protocol::{Catalog, CommandCode, MarkLists, Range, SearchResults, Title};

use crate::popup::{Choice, ChoiceAction, Menu, MenuScope, PopupId};

fn fav(key: impl ToString) -> Choice {
    Choice::new(
        "fav",
        ChoiceAction::command(CommandCode::FAV.with(Range::Display), key.to_string()),
    )
}

fn dnp(key: impl ToString) -> Choice {
    Choice::new(
        "dnp",
        ChoiceAction::command(CommandCode::DNP.with(Range::Display), key.to_string()),
    )
}

fn download(key: u32) -> Choice {
    Choice::new("download", ChoiceAction::Download(key))
}

fn row(label: String, choices: Vec<Choice>, position: Option<u32>, scope: MenuScope) -> Menu {
    Menu {
        label,
        choices,
        position,
        scope,
    }
}

/// Queue rows: previous titles (oldest first), the current title and
/// upcoming titles.  Streams get no menus at all.
pub fn queue(
    prev: &[Title],
    current: Option<&Title>,
    next: &[Title],
    is_stream: bool,
) -> Vec<(PopupId, Menu)> {
    if is_stream {
        return Vec::new();
    }
    let mut menus = Vec::new();
    let mut n = 0;
    let mut id = || {
        n += 1;
        PopupId::new(format!("q{}", n))
    };

    for t in prev.iter().rev() {
        let mut choices = vec![dnp(t.key)];
        if !t.is_favourite() {
            choices.push(fav(t.key));
        }
        choices.push(Choice::new(
            "replay",
            ChoiceAction::command(CommandCode::MOVE, t.key.to_string()),
        ));
        choices.push(download(t.key));
        choices.push(Choice::new("move", ChoiceAction::Move(t.key)));
        menus.push((id(), row(t.display(), choices, Some(t.key), MenuScope::Queue)));
    }

    if let Some(t) = current {
        let mut choices = vec![dnp(t.key)];
        if !t.is_favourite() {
            choices.push(fav(t.key));
        }
        choices.push(download(t.key));
        menus.push((
            id(),
            row(format!("▶ {}", t.display()), choices, Some(t.key), MenuScope::Queue),
        ));
    }

    for t in next {
        let mut choices = vec![dnp(t.key)];
        if !t.is_favourite() {
            choices.push(fav(t.key));
        }
        choices.push(Choice::new(
            "remove",
            ChoiceAction::command(CommandCode::REMOVE, t.key.to_string()),
        ));
        choices.push(download(t.key));
        choices.push(Choice::new("move", ChoiceAction::Move(t.key)));
        menus.push((id(), row(t.display(), choices, Some(t.key), MenuScope::Queue)));
    }
    menus
}

/// Search hits.  Favourites make no sense in favplay mode unless the search
/// ran over the do-not-play list, and dnp makes no sense on that list.
pub fn search(results: &SearchResults, fav_play: bool) -> Vec<(PopupId, Menu)> {
    let offer_fav = !fav_play || results.search_dnp;
    let offer_dnp = !results.search_dnp;
    let mut menus = Vec::new();
    let mut n = 0;
    let mut id = || {
        n += 1;
        PopupId::new(format!("s{}", n))
    };

    if !results.titles.is_empty() {
        let mut choices = Vec::new();
        if offer_fav {
            choices.push(fav(0));
        }
        if offer_dnp {
            choices.push(dnp(0));
        }
        choices.push(Choice::new(
            "next",
            ChoiceAction::command(CommandCode::INSERT, "0"),
        ));
        choices.push(Choice::new(
            "append",
            ChoiceAction::command(CommandCode::APPEND, "0"),
        ));
        menus.push((
            id(),
            row("All results".into(), choices, None, MenuScope::Search),
        ));
    }

    for t in &results.titles {
        let mut choices = Vec::new();
        if !t.is_favourite() {
            choices.push(fav(t.key));
        }
        if !t.is_denied() {
            choices.push(dnp(t.key));
        }
        choices.push(Choice::new(
            "next",
            ChoiceAction::command(CommandCode::INSERT, t.key.to_string()),
        ));
        choices.push(Choice::new(
            "append",
            ChoiceAction::command(CommandCode::APPEND, t.key.to_string()),
        ));
        choices.push(download(t.key));
        menus.push((
            id(),
            row(format!("{} - {}", t.artist, t.title), choices, None, MenuScope::Search),
        ));
    }

    let by_range = |range: Range, name: &str| {
        let mut choices = vec![Choice::new(
            "search",
            ChoiceAction::command(CommandCode::SEARCH.with(range), name),
        )];
        if offer_fav {
            choices.push(Choice::new(
                "fav",
                ChoiceAction::command(CommandCode::FAV.with(range), name),
            ));
        }
        if offer_dnp {
            choices.push(Choice::new(
                "dnp",
                ChoiceAction::command(CommandCode::DNP.with(range), name),
            ));
        }
        choices
    };

    for artist in &results.artists {
        menus.push((
            id(),
            row(
                artist.clone(),
                by_range(Range::Artist, artist),
                None,
                MenuScope::Search,
            ),
        ));
    }
    for (i, album) in results.albums.iter().enumerate() {
        let artist = results.albart.get(i).map(String::as_str).unwrap_or("");
        menus.push((
            id(),
            row(
                format!("{} - {}", artist, album),
                by_range(Range::Album, album),
                None,
                MenuScope::Search,
            ),
        ));
    }
    menus
}

/// Renders a mark pattern like `a=Artist` or `t*part` for display.
pub fn pattern_label(pattern: &str) -> String {
    let mut chars = pattern.chars();
    let (Some(field), Some(op)) = (chars.next(), chars.next()) else {
        return pattern.to_string();
    };
    let field = match field {
        't' => "Title",
        'a' => "Artist",
        'l' => "Album",
        'g' => "Genre",
        'd' => "Display",
        'p' => "Path",
        _ => "?",
    };
    let op = match op {
        '*' => "~",
        '=' => "=",
        other => return format!("{}: {}? {}", field, other, chars.as_str()),
    };
    format!("{}: {} {}", field, op, chars.as_str())
}

/// Deny and favourite list entries can be removed.  Doublets are display only.
pub fn lists(lists: &MarkLists) -> Vec<(PopupId, Menu)> {
    let entry = |prefix: &str, i: usize, pattern: &str, code: CommandCode| {
        (
            PopupId::new(format!("{}{}", prefix, i + 1)),
            row(
                pattern_label(pattern),
                vec![Choice::new("remove", ChoiceAction::command(code, pattern))],
                None,
                MenuScope::Lists,
            ),
        )
    };
    let dnp = lists
        .dnplist
        .iter()
        .enumerate()
        .map(|(i, p)| entry("d", i, p, CommandCode::DEL_DNP));
    let fav = lists
        .favlist
        .iter()
        .enumerate()
        .map(|(i, p)| entry("f", i, p, CommandCode::DEL_FAV));
    dnp.chain(fav).collect()
}

/// Profiles, channels and shortcuts.  The active entry cannot be switched to
/// or removed, and profile 1 can never be removed.
pub fn catalog(catalog: &Catalog, active: i32, shortcuts: &[i32]) -> Vec<(PopupId, Menu)> {
    let mut menus = Vec::new();
    let play = |id: i32| {
        Choice::new(
            "play",
            ChoiceAction::command(CommandCode::PROFILE, id.to_string()),
        )
    };
    let remove = |id: i32| {
        Choice::new(
            "remove",
            ChoiceAction::command(CommandCode::REMOVE_PROFILE, id.to_string()),
        )
    };
    let label = |id: i32, name: &str| {
        if id == active {
            format!("▶ {}", name)
        } else {
            name.to_string()
        }
    };

    for (i, name) in catalog.profile.iter().enumerate() {
        let id = i as i32 + 1;
        let mut choices = Vec::new();
        if id != active {
            choices.push(play(id));
            if id != 1 {
                choices.push(remove(id));
            }
        }
        choices.push(Choice::new("shortcut", ChoiceAction::AddShortcut(id)));
        menus.push((
            PopupId::new(format!("pro{}", id)),
            row(label(id, name), choices, None, MenuScope::Catalog),
        ));
    }

    for (i, name) in catalog.sname.iter().enumerate() {
        let id = -(i as i32 + 1);
        let mut choices = Vec::new();
        if id != active {
            choices.push(play(id));
            choices.push(remove(id));
        }
        choices.push(Choice::new("shortcut", ChoiceAction::AddShortcut(id)));
        menus.push((
            PopupId::new(format!("ch{}", i + 1)),
            row(label(id, name), choices, None, MenuScope::Catalog),
        ));
    }

    for (i, &id) in shortcuts.iter().enumerate() {
        let Some(name) = catalog.name_of(id) else {
            continue;
        };
        let mut choices = Vec::new();
        if id != active {
            choices.push(play(id));
        }
        choices.push(Choice::new("unshortcut", ChoiceAction::RemoveShortcut(id)));
        menus.push((
            PopupId::new(format!("sc{}", i + 1)),
            row(label(id, name), choices, None, MenuScope::Catalog),
        ));
    }
    menus
}

#[cfg(test)]
mod tests {
    use super::*;

    fn title(key: u32, flags: u32) -> Title {
        Title {
            key,
            artist: "A".into(),
            title: format!("T{}", key),
            flags,
            ..Default::default()
        }
    }

    fn labels(menu: &Menu) -> Vec<&str> {
        menu.choices.iter().map(|c| c.label.as_str()).collect()
    }

    #[test]
    fn queue_rows_follow_flags_and_position() {
        let menus = queue(
            &[title(1, 0), title(2, 1)],
            Some(&title(3, 0)),
            &[title(4, 0)],
            false,
        );
        assert_eq!(menus.len(), 4);
        // `prev` arrives most recent first and is shown oldest first.
        assert_eq!(menus[0].1.position, Some(2));
        assert_eq!(labels(&menus[0].1), ["dnp", "replay", "download", "move"]);
        assert_eq!(labels(&menus[1].1), ["dnp", "fav", "replay", "download", "move"]);
        assert_eq!(labels(&menus[2].1), ["dnp", "fav", "download"]);
        assert_eq!(labels(&menus[3].1), ["dnp", "fav", "remove", "download", "move"]);
        assert_eq!(menus[2].0, PopupId::new("q3"));
        assert_eq!(
            menus[2].1.choices[1].action,
            ChoiceAction::command(CommandCode(0x0809), "3")
        );
    }

    #[test]
    fn played_rows_can_move_but_current_cannot() {
        let menus = queue(&[title(1, 0)], Some(&title(2, 0)), &[title(3, 0)], false);
        let moves: Vec<Vec<&ChoiceAction>> = menus
            .iter()
            .map(|(_, m)| {
                m.choices
                    .iter()
                    .filter(|c| c.label == "move")
                    .map(|c| &c.action)
                    .collect()
            })
            .collect();
        assert_eq!(moves[0], [&ChoiceAction::Move(1)]);
        assert!(moves[1].is_empty());
        assert_eq!(moves[2], [&ChoiceAction::Move(3)]);
    }

    #[test]
    fn stream_queue_has_no_menus() {
        assert!(queue(&[title(1, 0)], Some(&title(2, 0)), &[], true).is_empty());
    }

    #[test]
    fn search_in_favplay_hides_fav() {
        let results = SearchResults {
            titles: vec![title(9, 0)],
            artists: vec!["Abba".into()],
            albums: vec!["Gold".into()],
            albart: vec!["Abba".into()],
            search_dnp: false,
        };
        let menus = search(&results, true);
        assert_eq!(menus.len(), 4);
        assert_eq!(labels(&menus[0].1), ["dnp", "next", "append"]);
        // Per-title choices only depend on the title flags.
        assert_eq!(labels(&menus[1].1), ["fav", "dnp", "next", "append", "download"]);
        assert_eq!(labels(&menus[2].1), ["search", "dnp"]);
        assert_eq!(
            menus[3].1.choices[0].action,
            ChoiceAction::command(CommandCode(0x0413), "Gold")
        );
        assert_eq!(menus[3].1.label, "Abba - Gold");
    }

    #[test]
    fn list_entries_remove_by_pattern() {
        let menus = lists(&MarkLists {
            dnplist: vec!["a=Nickelback".into()],
            favlist: vec!["t*love".into()],
            dbllist: vec!["ignored".into()],
        });
        assert_eq!(menus.len(), 2);
        assert_eq!(menus[0].1.label, "Artist: = Nickelback");
        assert_eq!(
            menus[1].1.choices[0].action,
            ChoiceAction::command(CommandCode::DEL_FAV, "t*love")
        );
    }

    #[test]
    fn catalog_protects_active_and_first_profile() {
        let names = Catalog {
            profile: vec!["mixed".into(), "jazz".into()],
            sname: vec!["fm4".into()],
            debug: 0,
        };
        let menus = catalog(&names, -1, &[2, 5]);
        assert_eq!(labels(&menus[0].1), ["play", "shortcut"]);
        assert_eq!(labels(&menus[1].1), ["play", "remove", "shortcut"]);
        assert_eq!(labels(&menus[2].1), ["shortcut"]);
        assert_eq!(menus[2].1.label, "▶ fm4");
        // Shortcut 5 is not in the catalog and is skipped.
        assert_eq!(menus.len(), 4);
        assert_eq!(labels(&menus[3].1), ["play", "unshortcut"]);
    }
}
