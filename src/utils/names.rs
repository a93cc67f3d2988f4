/// Random resource names in the `adjective_surname` style
use rand::seq::SliceRandom;

const ADJECTIVES: &[&str] = &[
    "admiring", "agitated", "awesome", "bold", "brave", "busy", "clever", "compassionate",
    "determined", "eager", "elegant", "epic", "festive", "focused", "friendly", "gallant",
    "gifted", "happy", "hopeful", "inspiring", "jolly", "keen", "laughing", "lucid",
    "modest", "nifty", "optimistic", "peaceful", "quirky", "relaxed", "serene", "sharp",
    "stoic", "tender", "upbeat", "vibrant", "wizardly", "youthful", "zealous",
];

const SURNAMES: &[&str] = &[
    "albattani", "babbage", "bardeen", "bell", "bhabha", "curie", "darwin", "dijkstra",
    "einstein", "euclid", "feynman", "galileo", "goldberg", "hamilton", "hopper", "hypatia",
    "johnson", "kepler", "knuth", "lamport", "lovelace", "meitner", "morse", "newton",
    "noether", "pascal", "ritchie", "shannon", "tesla", "thompson", "torvalds", "turing",
    "wozniak", "yalow",
];

/// Generate a random name such as `focused_turing`
pub fn generate_name() -> String {
    let mut rng = rand::thread_rng();
    let adjective = ADJECTIVES.choose(&mut rng).copied().unwrap_or("eager");
    let surname = SURNAMES.choose(&mut rng).copied().unwrap_or("turing");
    format!("{}_{}", adjective, surname)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_name_shape() {
        let name = generate_name();
        let (adjective, surname) = name.split_once('_').unwrap();
        assert!(ADJECTIVES.contains(&adjective));
        assert!(SURNAMES.contains(&surname));
    }
}
