//! Curated fallback pools.
//!
//! When generation runs out of attempts, content comes from here. Selection is
//! deterministic: a caller-supplied selector indexes into the eligible entries,
//! so the same context always yields the same value.

use crate::contracts::{ActionVerdict, BotAction, BotActionContract, Contract, GeneratedPuzzle, Scenario};
use crate::{ContentRules, Difficulty, PerilLevel, text};
use tracing::{debug, instrument};

/// Words of the player's action quoted in a fallback outcome.
pub const SNIPPET_WORDS: usize = 8;

/// Words of a scenario option quoted in a template bot action.
pub const OPTION_WORDS: usize = 8;

const SCENARIOS: &[&str] = &[
    "A swarm of angry hornets pours out of the hollow oak beside the trail, and you could either dive into the cold creek below or wrap your jacket around your head and walk calmly away. What do you do?",
    "The freezer door of the abandoned diner slams shut behind you and the light flickers out, so you could either pry at the hinges with a butter knife or bang on the vents until someone hears. What do you do?",
    "A runaway shopping cart loaded with fireworks rolls toward the bonfire at the beach party, and you could either sprint after it across the sand or shout for everyone to duck behind the dunes. What do you do?",
    "Halfway across the frozen lake you hear the ice groan and a thin crack races toward your boots, so you could either lie flat and crawl back to shore or run for the fishing shack ahead. What do you do?",
    "The museum's prized python has slipped out of its tank and is coiling around the ankles of a frozen tour guide, and you could either tempt it away with a heat lamp or gently lift its head yourself. What do you do?",
    "A hot air balloon you boarded for a sunset ride starts drifting toward a row of power lines, and you could either vent the burner to drop fast or toss the sandbags overboard to climb higher. What do you do?",
    "Your canoe drifts into a narrow canyon just as a flash flood roars around the bend upstream, and you could either haul the canoe onto a ledge or paddle hard for the wide bank downstream. What do you do?",
    "A grumpy moose blocks the only road out of the campsite and lowers its antlers at your car, and you could either reverse slowly into the trees or honk and flash the headlights until it leaves. What do you do?",
    "The elevator in the old hotel lurches to a stop between floors and smoke begins curling through the ceiling panel, so you could either climb through the hatch onto the roof or press the alarm and wait for rescue. What do you do?",
    "A sandstorm swallows the desert highway and your jeep's engine sputters to silence miles from the nearest town, and you could either seal yourself inside with the water jugs or follow the fence posts on foot. What do you do?",
    "During the cooking contest your deep fryer erupts in flames and the fire spreads toward the judges' table, so you could either smother it with the metal lid or grab the extinguisher from across the tent. What do you do?",
    "A pack of wild monkeys steals your backpack with your passport inside and scampers up the temple steps, and you could either bribe them with bananas from the market or chase them through the crumbling ruins. What do you do?",
];

const EASY_PUZZLES: &[(&str, &str)] = &[
    ("HOT POTATO", "Party Games"),
    ("BREAK A LEG", "Theater Superstitions"),
    ("PIECE OF CAKE", "Simple Chores"),
    ("COLD FEET", "Wedding Nerves"),
    ("NIGHT OWL", "Sleep Habits"),
    ("SPILL THE BEANS", "Sharing Secrets"),
];

const MEDIUM_PUZZLES: &[(&str, &str)] = &[
    ("BREAK THE ICE", "Social Idioms"),
    ("BITE THE BULLET", "Facing Hardship"),
    ("UNDER THE WEATHER", "Feeling Unwell"),
    ("HIT THE SACK", "Going To Bed"),
    ("BURN THE MIDNIGHT OIL", "Late Night Work"),
    ("ROLLING IN THE DOUGH", "Being Wealthy"),
];

const HARD_PUZZLES: &[(&str, &str)] = &[
    ("ONCE IN A BLUE MOON", "Rare Events"),
    ("ADD FUEL TO THE FIRE", "Worsening Conflicts"),
    ("A PENNY FOR YOUR THOUGHTS", "Curious Questions"),
    ("BARKING UP THE WRONG TREE", "Misguided Efforts"),
    ("CRY OVER SPILT MILK", "Pointless Regret"),
    ("LET SLEEPING DOGS LIE", "Avoiding Old Trouble"),
];

const VERY_HARD_PUZZLES: &[(&str, &str)] = &[
    ("BETWEEN A ROCK AND A HARD PLACE", "Tough Dilemmas"),
    ("HIT THE NAIL ON THE HEAD", "Exactly Right"),
    ("KILL TWO BIRDS WITH ONE STONE", "Efficient Shortcuts"),
    ("THE EARLY BIRD CATCHES THE WORM", "Morning Wisdom"),
    ("ACTIONS SPEAK LOUDER THAN WORDS", "Deeds Over Talk"),
    ("EVERY CLOUD HAS A SILVER LINING", "Hidden Blessings"),
];

const SUCCESS_OUTCOMES: &[&str] = &[
    "You commit to \"{action}\" and it pays off. The danger slides past with only inches to spare.",
    "You go with \"{action}\" and the gamble works. You come out rattled but unharmed.",
    "Against the odds, \"{action}\" turns out to be exactly right. You escape while the others hold their breath.",
];

const FAILURE_OUTCOMES: &[&str] = &[
    "You commit to \"{action}\" but it backfires. The danger catches you and you lose a life.",
    "You try \"{action}\" and for a moment it seems to work. Then everything goes wrong at once.",
    "Sadly, \"{action}\" is not the answer here. You limp away battered and one life poorer.",
];

const CALM_ACTIONS: &[&str] = &[
    "I grin at the danger, take a slow breath, and look for the safest path through this mess.",
    "I crack my knuckles and calmly study every exit before I make my very deliberate next move.",
    "I stay relaxed, keep my back to the wall, and let the chaos come to me slowly.",
    "I hum a little tune while I carefully test each step and keep my balance steady.",
];

const WARY_ACTIONS: &[&str] = &[
    "I move carefully, keep low to the ground, and watch every shadow before I take a step.",
    "I press myself against the nearest wall and edge toward cover while I listen for trouble.",
    "I grab something sturdy to shield myself and back away slowly from the source of danger.",
    "I hold my breath, stay perfectly still, and wait for the right moment to slip away.",
];

const DESPERATE_ACTIONS: &[&str] = &[
    "I throw everything I have left into one careful dash toward the nearest safe spot.",
    "I clutch my last lucky charm and crawl toward cover, refusing to quit now.",
    "I shield my face with both arms and scramble for any gap that leads to safety.",
    "I whisper a quick prayer, steady my shaking hands, and carefully pick the quieter escape route.",
];

const BOT_TEMPLATE: &str = "I {adverb} choose to {option} and keep my eyes open for whatever comes next.";

const LAST_RESORT_TEMPLATE: &str =
    "I {adverb} go for the {word} before anything else can go wrong.";

/// Every fallback scenario.
pub fn scenarios() -> &'static [&'static str] {
    SCENARIOS
}

/// Fallback phrase and category pairs for a difficulty.
pub fn puzzles(difficulty: Difficulty) -> &'static [(&'static str, &'static str)] {
    match difficulty {
        Difficulty::Easy => EASY_PUZZLES,
        Difficulty::Medium => MEDIUM_PUZZLES,
        Difficulty::Hard => HARD_PUZZLES,
        Difficulty::VeryHard => VERY_HARD_PUZZLES,
    }
}

/// Fallback bot actions for a peril level.
pub fn bot_actions(peril: PerilLevel) -> &'static [&'static str] {
    match peril {
        PerilLevel::Calm => CALM_ACTIONS,
        PerilLevel::Wary => WARY_ACTIONS,
        PerilLevel::Desperate => DESPERATE_ACTIONS,
    }
}

/// Picks the entry at `selector` among eligible entries, or among all entries
/// when none is eligible.
///
/// # Panics
///
/// Panics if `pool` is empty. Every pool in this module is non-empty.
pub fn pick<T>(pool: &[T], selector: u64, eligible: impl Fn(&T) -> bool) -> &T {
    let candidates: Vec<&T> = pool.iter().filter(|entry| eligible(entry)).collect();
    let candidates = if candidates.is_empty() {
        pool.iter().collect()
    } else {
        candidates
    };
    let index = (selector % candidates.len() as u64) as usize;
    candidates[index]
}

fn is_recent(recent: &[String], candidate: &str) -> bool {
    let normalized = text::normalize(candidate);
    recent.iter().any(|seen| text::normalize(seen) == normalized)
}

/// Fallback scenario avoiding the recent history.
#[instrument(skip(recent), fields(recent = recent.len()))]
pub fn scenario(recent: &[String], selector: u64) -> Scenario {
    let chosen = pick(SCENARIOS, selector, |entry| !is_recent(recent, entry));
    debug!(scenario = %chosen, "Selected fallback scenario");
    Scenario::new(*chosen)
}

/// Fallback puzzle for a difficulty, avoiding recent phrases.
#[instrument(skip(recent))]
pub fn puzzle(difficulty: Difficulty, recent: &[String], selector: u64) -> GeneratedPuzzle {
    let (phrase, category) = pick(puzzles(difficulty), selector, |(phrase, _)| {
        !is_recent(recent, phrase)
    });
    debug!(phrase, category, "Selected fallback puzzle");
    GeneratedPuzzle::new(*phrase, *category)
}

/// First words of an action, stripped of anything that could break sentence
/// or marker parsing.
///
/// When the opening words carry no content the snippet starts at the first
/// word that does, so the quote still names what the player tried.
pub fn action_snippet(action: &str) -> String {
    let cleaned: String = action
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '\'' | '-' | ' ') {
                c
            } else {
                ' '
            }
        })
        .collect();
    let words: Vec<&str> = cleaned.split_whitespace().collect();
    let opening = words[..words.len().min(SNIPPET_WORDS)].join(" ");
    let start = if text::content_words(&opening).is_empty() {
        words
            .iter()
            .position(|word| !text::content_words(word).is_empty())
            .unwrap_or(0)
    } else {
        0
    };
    let snippet = words
        .iter()
        .skip(start)
        .take(SNIPPET_WORDS)
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    if snippet.is_empty() {
        "doing nothing".to_string()
    } else {
        snippet
    }
}

/// Fallback verdict narrating a decided result around the player's own words.
#[instrument(skip(action))]
pub fn verdict(action: &str, success: bool, selector: u64) -> ActionVerdict {
    let pool = if success { SUCCESS_OUTCOMES } else { FAILURE_OUTCOMES };
    let template = pick(pool, selector, |_| true);
    let outcome = template.replace("{action}", &action_snippet(action));
    ActionVerdict::new(success, outcome)
}

/// Fallback bot action.
///
/// Commits to one of the scenario's options through a peril-toned template
/// when one fits the rules; otherwise picks from the peril pool.
#[instrument(skip(rules, options), fields(options = options.len()))]
pub fn bot_action(
    rules: &ContentRules,
    peril: PerilLevel,
    options: &[String],
    selector: u64,
) -> BotAction {
    let contract = BotActionContract::new(rules, options);
    let start = if options.is_empty() {
        0
    } else {
        (selector % options.len() as u64) as usize
    };

    let templated = options
        .iter()
        .cycle()
        .skip(start)
        .take(options.len())
        .map(|option| {
            let option = option
                .trim_end_matches(['.', '!', '?', ','])
                .split_whitespace()
                .take(OPTION_WORDS)
                .collect::<Vec<_>>()
                .join(" ");
            BotAction::new(
                BOT_TEMPLATE
                    .replace("{adverb}", peril.adverb())
                    .replace("{option}", &option),
            )
        })
        .find(|candidate| contract.validate(candidate).is_ok());

    if let Some(action) = templated {
        debug!(action = %action, "Templated fallback bot action");
        return action;
    }

    let pooled = BotAction::new(*pick(bot_actions(peril), selector, |entry| {
        contract.validate(&BotAction::new(*entry)).is_ok()
    }));
    if contract.validate(&pooled).is_ok() {
        return pooled;
    }

    // Nothing curated commits to these options; name the longest option word.
    match options
        .iter()
        .flat_map(|option| text::content_words(option))
        .max_by_key(String::len)
    {
        Some(word) => {
            let action = BotAction::new(
                LAST_RESORT_TEMPLATE
                    .replace("{adverb}", peril.adverb())
                    .replace("{word}", &word),
            );
            debug!(action = %action, "Last-resort fallback bot action");
            action
        }
        None => pooled,
    }
}
