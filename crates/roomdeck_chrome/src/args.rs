use std::collections::BTreeSet;

use roomdeck_designer::RoomDimensions;
use tracing::error;

#[derive(Debug, Default, PartialEq)]
pub struct Args {
    pub datapath: Option<String>,
    pub catalog: Option<String>,
    pub assets: Option<String>,
    pub project: Option<String>,
    pub room: Option<RoomDimensions>,
    pub endpoint: Option<String>,
    pub add: Vec<String>,
    pub save: Option<String>,
}

/// `WxLxH` in meters, e.g. `7x8x3`.
pub fn parse_room(s: &str) -> Option<RoomDimensions> {
    let mut parts = s.split(['x', 'X']).map(|p| p.trim().parse::<f32>());
    let (Some(Ok(w)), Some(Ok(l)), Some(Ok(h)), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };
    RoomDimensions::new(w, l, h).ok()
}

impl Args {
    // parse arguments, return set of unrecognized args
    pub fn parse(args: &[String]) -> (Self, BTreeSet<String>) {
        let mut unrecognized_args = BTreeSet::new();
        let mut res = Args::default();

        let mut i = 0;
        let len = args.len();
        while i < len {
            let arg = &args[i];

            let takes_value = matches!(
                arg.as_str(),
                "--datapath"
                    | "--catalog"
                    | "--assets"
                    | "--project"
                    | "--room"
                    | "--endpoint"
                    | "--add"
                    | "--save"
            );
            if !takes_value {
                unrecognized_args.insert(arg.clone());
                i += 1;
                continue;
            }

            i += 1;
            let Some(value) = args.get(i) else {
                error!("{arg} argument missing?");
                continue;
            };

            match arg.as_str() {
                "--datapath" => res.datapath = Some(value.clone()),
                "--catalog" => res.catalog = Some(value.clone()),
                "--assets" => res.assets = Some(value.clone()),
                "--project" => res.project = Some(value.clone()),
                "--endpoint" => res.endpoint = Some(value.clone()),
                "--add" => res.add.push(value.clone()),
                "--save" => res.save = Some(value.clone()),
                "--room" => match parse_room(value) {
                    Some(room) => res.room = Some(room),
                    None => error!("could not parse room '{value}', expected WxLxH"),
                },
                _ => {}
            }

            i += 1;
        }

        (res, unrecognized_args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_known_flags() {
        let (parsed, unknown) = Args::parse(&args(&[
            "--datapath",
            "/tmp/rd",
            "--room",
            "5x6x2.8",
            "--add",
            "armchair",
            "--add",
            "coffee_table",
            "--bogus",
        ]));

        assert_eq!(parsed.datapath.as_deref(), Some("/tmp/rd"));
        assert_eq!(parsed.room, RoomDimensions::new(5.0, 6.0, 2.8).ok());
        assert_eq!(parsed.add, vec!["armchair", "coffee_table"]);
        assert_eq!(unknown, BTreeSet::from(["--bogus".to_string()]));
    }

    #[test]
    fn bad_room_is_ignored() {
        assert_eq!(parse_room("5x6"), None);
        assert_eq!(parse_room("5x6x9"), None);
        assert_eq!(parse_room("axbxc"), None);

        let (parsed, _) = Args::parse(&args(&["--room", "1x2x3x4", "--project"]));
        assert_eq!(parsed.room, None);
        assert_eq!(parsed.project, None);
    }
}
