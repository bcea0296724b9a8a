use zzmod::builders::{
    ConditionBuilder, DamageTypeBuilder, FormBuilder, KeywordBuilder, ModifierBuilder,
    StatBuilder, ValueBuilder,
};
use zzmod::data::{load_referenced_matchers, load_stat_replacers};
use zzmod::dependency::StatDependencyGraph;
use zzmod::formula::Value;
use zzmod::game::{AttackDamageHand, Entity, Keyword};
use zzmod::parsing::{CoreParser, MatcherData, ParseResult, ParsingData, ParsingStep, StatMatchers};
use zzmod::path::{NodeType, PathDefinition};
use zzmod::source::ModifierSource;
use zzmod::*;

const REFERENCES: &str = r#"{
    "Keyword": [
        { "regex": "attack", "keyword": "Attack" },
        { "regex": "spell", "keyword": "Spell" }
    ],
    "DamageType": [
        { "regex": "fire", "damage_type": "Fire" },
        { "regex": "cold", "damage_type": "Cold" }
    ]
}"#;

const REPLACERS: &str = r#"[
    { "regex": "(.*) to maximum life and mana", "replacements": ["$1 to maximum life", "$1 to maximum mana"] }
]"#;

fn form(regex: &str, form: FormBuilder) -> MatcherData {
    MatcherData::new(
        regex,
        ModifierBuilder::new()
            .with_form(form)
            .unwrap()
            .with_value(ValueBuilder::placeholder(0))
            .unwrap(),
    )
}

fn stat(regex: &str, stat: StatBuilder) -> MatcherData {
    MatcherData::new(regex, ModifierBuilder::new().with_stat(stat).unwrap())
}

fn condition(regex: &str, condition: ConditionBuilder) -> MatcherData {
    MatcherData::new(
        regex,
        ModifierBuilder::new().with_condition(condition).unwrap(),
    )
}

fn parsing_data() -> ParsingData {
    let mut data = ParsingData {
        referenced_matchers: load_referenced_matchers(REFERENCES).unwrap(),
        stat_replacers: load_stat_replacers(REPLACERS).unwrap(),
        ..ParsingData::default()
    };
    data.stat_matchers.insert(
        ParsingStep::FormAndStat,
        StatMatchers::new(vec![MatcherData::new(
            r"# to ({StatMatchers})",
            ModifierBuilder::new()
                .with_form(FormBuilder::base_add())
                .unwrap()
                .with_stat(StatBuilder::reference(0))
                .unwrap()
                .with_value(ValueBuilder::placeholder(0))
                .unwrap(),
        )]),
    );
    data.stat_matchers.insert(
        ParsingStep::Form,
        StatMatchers::new(vec![
            form("#% increased", FormBuilder::increase()),
            form("#% reduced", FormBuilder::reduce()),
            form("#% more", FormBuilder::more()),
        ]),
    );
    data.stat_matchers.insert(
        ParsingStep::GeneralStat,
        StatMatchers::new(vec![
            stat("maximum life", StatBuilder::from_identity("Life")),
            stat("maximum mana", StatBuilder::from_identity("Mana")),
        ])
        .with_reference_names(&["StatMatchers"]),
    );
    data.stat_matchers.insert(
        ParsingStep::DamageStat,
        StatMatchers::new(vec![stat(
            "({DamageType}) damage",
            StatBuilder::damage(DamageTypeBuilder::damage_type(0)),
        )]),
    );
    data.stat_matchers.insert(
        ParsingStep::Condition,
        StatMatchers::new(vec![
            condition(
                "with ({Keyword}) skills",
                ConditionBuilder::with_keyword(KeywordBuilder::keyword(0)),
            ),
            condition(
                "with main hand",
                ConditionBuilder::attack_with(AttackDamageHand::MainHand),
            ),
        ]),
    );
    data
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn parse(parser: &CoreParser, line: &str) -> ParseResult {
    init_tracing();
    parser.parse(line, ModifierSource::Global, Entity::Character)
}

fn total(graph: &StatDependencyGraph, identity: &str) -> Option<NodeValue> {
    graph
        .value(
            &Stat::new(identity, Entity::Character),
            NodeType::Total,
            &PathDefinition::MainPath,
        )
        .unwrap()
}

/// Parse a small item and compute totals from the registered modifiers.
#[test]
fn test_parsed_lines_feed_totals() {
    let parser = CoreParser::new(parsing_data()).unwrap();
    let mut graph = StatDependencyGraph::new();

    for line in [
        "+40 to maximum Life and Mana",
        "+60 to maximum life",
        "20% increased maximum life",
        "10% reduced maximum life",
        "50% more maximum mana",
    ] {
        let result = parse(&parser, line);
        assert!(result.is_success(), "failed to parse '{}'", line);
        graph.register_all(result.modifiers().to_vec());
    }

    // Life: (40 + 60) * (1 + (20 - 10) / 100)
    assert_eq!(total(&graph, "Life"), Some(NodeValue::from(110.0)));
    // Mana: 40 * 1.5
    assert_eq!(total(&graph, "Mana"), Some(NodeValue::from(60.0)));
    assert_eq!(total(&graph, "Energy Shield"), None);
}

/// A replacer splits one line into one modifier per part.
#[test]
fn test_replacer_split_produces_both_stats() {
    let parser = CoreParser::new(parsing_data()).unwrap();
    let result = parse(&parser, "+40 to maximum life and mana");

    let stats: Vec<String> = result
        .modifiers()
        .iter()
        .map(|m| m.stat.identity.as_str().to_string())
        .collect();
    assert_eq!(stats, vec!["Life", "Mana"]);
    for modifier in result.modifiers() {
        assert_eq!(modifier.form, Form::BaseAdd);
        assert_eq!(
            modifier.evaluate(&StatContext::new()),
            Some(NodeValue::from(40.0))
        );
    }
}

/// Referenced tables select the damage type and the keyword condition.
#[test]
fn test_damage_with_keyword_condition() {
    let parser = CoreParser::new(parsing_data()).unwrap();
    let result = parse(&parser, "20% increased Cold Damage with Spell skills");
    let modifiers = result.modifiers();

    assert_eq!(modifiers.len(), 1);
    assert_eq!(modifiers[0].stat.identity.as_str(), "Cold.Damage");
    assert_eq!(modifiers[0].form, Form::Increase);

    // The condition reads the keyword flag of the active skill part
    let condition = modifiers[0].condition.clone().unwrap();
    let spell = Stat::active_skill_has_keyword(Entity::Character, Keyword::Spell);
    let casting = StatContext::new().with(spell.clone(), true);
    let attacking = StatContext::new().with(spell, false);
    assert_eq!(condition.calculate(&casting), Some(NodeValue::from(true)));
    assert_ne!(condition.calculate(&attacking), Some(NodeValue::from(true)));
}

/// Conditioned modifiers only count while their condition holds.
#[test]
fn test_conditional_modifier_in_graph() {
    let parser = CoreParser::new(parsing_data()).unwrap();
    let mut graph = StatDependencyGraph::new();
    graph.register_all(parse(&parser, "+10 to maximum life").modifiers().to_vec());
    graph.register_all(
        parse(&parser, "+5 to maximum life with attack skills")
            .modifiers()
            .to_vec(),
    );
    assert_eq!(total(&graph, "Life"), Some(NodeValue::from(10.0)));

    // Turn on the keyword flag through a modifier of its own
    let attack = Stat::active_skill_has_keyword(Entity::Character, Keyword::Attack);
    graph.register(Modifier::new(
        attack,
        Form::TotalOverride,
        ValueBuilder::constant(1.0).build(&BuildParameters::default()).unwrap(),
        ModifierSource::Global,
    ));
    assert_eq!(total(&graph, "Life"), Some(NodeValue::from(15.0)));
}

/// Text no table consumes is reported back.
#[test]
fn test_unparsed_remainder() {
    let parser = CoreParser::new(parsing_data()).unwrap();
    match parse(&parser, "20% increased maximum life per frenzy charge") {
        ParseResult::Failure { line, remaining } => {
            assert_eq!(line, "20% increased maximum life per frenzy charge");
            assert_eq!(remaining, "per frenzy charge");
        }
        ParseResult::Success(_) => panic!("expected a failure"),
    }
    assert!(!parse(&parser, "Totally unrelated text").is_success());
}

/// A damage-only condition on a non-damage stat fails the whole line.
#[test]
fn test_type_mismatch_is_failure() {
    let parser = CoreParser::new(parsing_data()).unwrap();
    match parse(&parser, "20% increased maximum life with main hand") {
        ParseResult::Failure { remaining, .. } => {
            assert_eq!(remaining, "20% increased maximum life with main hand");
        }
        ParseResult::Success(_) => panic!("expected a failure"),
    }

    // The same condition on damage is fine
    let result = parse(&parser, "20% increased fire damage with main hand");
    assert!(result.is_success());
    assert_eq!(result.modifiers().len(), 1);
}

/// Every entity gets its own stats.
#[test]
fn test_entity_follows_modifier_source_entity() {
    let parser = CoreParser::new(parsing_data()).unwrap();
    let result = parser.parse("+12 to maximum life", ModifierSource::Global, Entity::Minion);
    let modifier = &result.modifiers()[0];
    assert_eq!(modifier.stat, Stat::new("Life", Entity::Minion));
    assert_eq!(modifier.to_string(), "Life (Minion) BaseAdd: 12");
}
