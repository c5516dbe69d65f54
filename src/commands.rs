/// Available commands and autocomplete logic

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "products",
    aliases: &["p", "product", "list"],
    description: "Browse all products",
  },
  Command {
    name: "categories",
    aliases: &["c", "cat", "category"],
    description: "Browse categories",
  },
  Command {
    name: "new",
    aliases: &["n", "add", "create"],
    description: "Create a product",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit shelf",
  },
];

/// Get autocomplete suggestions for a given input, best match first
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input = input.trim().to_lowercase();

  if input.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&'static Command, u8)> = COMMANDS
    .iter()
    .filter_map(|cmd| match_rank(cmd, &input).map(|rank| (cmd, rank)))
    .collect();

  // Stable, so equal ranks keep declaration order
  matches.sort_by_key(|(_, rank)| *rank);
  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

/// Lower is better: exact name, exact alias, name prefix, alias prefix,
/// name substring, alias substring
fn match_rank(cmd: &Command, input: &str) -> Option<u8> {
  let aliases = cmd.aliases.iter();
  if cmd.name == input {
    Some(0)
  } else if aliases.clone().any(|a| *a == input) {
    Some(1)
  } else if cmd.name.starts_with(input) {
    Some(2)
  } else if aliases.clone().any(|a| a.starts_with(input)) {
    Some(3)
  } else if cmd.name.contains(input) {
    Some(4)
  } else if aliases.clone().any(|a| a.contains(input)) {
    Some(5)
  } else {
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    let suggestions = get_suggestions("");
    assert_eq!(suggestions.len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_match() {
    let suggestions = get_suggestions("products");
    assert_eq!(suggestions[0].name, "products");
  }

  #[test]
  fn test_alias_match() {
    assert_eq!(get_suggestions("c")[0].name, "categories");
    assert_eq!(get_suggestions("add")[0].name, "new");
  }

  #[test]
  fn test_prefix_match() {
    let suggestions = get_suggestions("prod");
    assert_eq!(suggestions[0].name, "products");
  }

  #[test]
  fn test_fuzzy_match() {
    let suggestions = get_suggestions("gori");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "categories");
  }

  #[test]
  fn test_no_match() {
    assert!(get_suggestions("zzz").is_empty());
  }
}
