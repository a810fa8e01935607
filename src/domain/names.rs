//! Human-readable session names and local port selection.
//!
//! Callers pass the random source in, so tests can use a seeded generator.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::domain::config::{MAX_LOCAL_PORT, MIN_LOCAL_PORT, TunnelConfig};
use crate::domain::session::SessionPlan;

/// Number of words in a key name (`word_word_word_word`).
pub const KEY_NAME_WORDS: usize = 4;
/// Number of words in a droplet name (`word-word`).
pub const INSTANCE_NAME_WORDS: usize = 2;

/// Lowercase ASCII words, safe in SSH key names, hostnames and file names.
const WORDS: &[&str] = &[
    "acorn", "alder", "amber", "anchor", "anvil", "apple", "arbor", "arrow", "aspen", "atlas",
    "badge", "bamboo", "banjo", "barley", "basil", "beacon", "birch", "bison", "blossom",
    "boulder", "bramble", "breeze", "brook", "bugle", "cabin", "cactus", "candle", "canyon",
    "cargo", "cedar", "cello", "chalk", "cherry", "cinder", "citrus", "clover", "cobalt",
    "comet", "copper", "coral", "cotton", "crane", "creek", "cricket", "crystal", "cypress",
    "daisy", "delta", "denim", "dune", "eagle", "ember", "falcon", "fern", "fiddle", "fjord",
    "flint", "forest", "fossil", "garnet", "geyser", "ginger", "glacier", "granite", "gravel",
    "harbor", "hazel", "heron", "hollow", "honey", "indigo", "island", "ivory", "jasper",
    "juniper", "kettle", "lagoon", "lantern", "larch", "lemon", "lilac", "linen", "lotus",
    "lunar", "mango", "maple", "marble", "meadow", "mesa", "mint", "moss", "nectar", "nickel",
    "oasis", "ocean", "olive", "onyx", "orchid", "otter", "paddle", "pebble", "pepper",
    "pine", "plume", "pollen", "poppy", "prairie", "quartz", "quill", "raven", "reef",
    "ridge", "river", "robin", "saffron", "sage", "sequoia", "shale", "sierra", "silver",
    "slate", "sparrow", "spruce", "summit", "swallow", "tango", "thicket", "thistle",
    "thunder", "timber", "topaz", "tulip", "tundra", "umber", "valley", "velvet", "violet",
    "walnut", "willow", "winter", "yarrow", "zephyr",
];

/// Picks `count` distinct words and joins them with `sep`.
fn random_words(rng: &mut impl Rng, count: usize, sep: &str) -> String {
    WORDS
        .choose_multiple(rng, count)
        .copied()
        .collect::<Vec<_>>()
        .join(sep)
}

/// Name for the transient keypair and its uploaded credential.
pub fn key_name(rng: &mut impl Rng) -> String {
    random_words(rng, KEY_NAME_WORDS, "_")
}

/// Name for the droplet. Hyphen-separated so it is a valid hostname.
pub fn instance_name(rng: &mut impl Rng) -> String {
    random_words(rng, INSTANCE_NAME_WORDS, "-")
}

/// Pseudo-random local port in `[1025, 65535]`.
pub fn local_port(rng: &mut impl Rng) -> u16 {
    rng.gen_range(MIN_LOCAL_PORT..=MAX_LOCAL_PORT)
}

/// Decide every name and the port before anything is acquired.
///
/// A port fixed in the configuration wins over a random one.
pub fn plan(cfg: &TunnelConfig, rng: &mut impl Rng) -> SessionPlan {
    SessionPlan {
        key_name: key_name(rng),
        instance_name: instance_name(rng),
        local_port: cfg.tunnel.port.unwrap_or_else(|| local_port(rng)),
        region: cfg.droplet.region.clone(),
        image: cfg.droplet.image.clone(),
        size: cfg.droplet.size.clone(),
        ssh_user: cfg.tunnel.user.clone(),
    }
}
