use serde_json::json;

use super::*;

#[test]
fn empty_condition_is_true() {
    assert!(evaluate_condition("", &json!({})));
    assert!(evaluate_condition("   ", &json!({})));
}

#[test]
fn admin_check_against_guest_is_false() {
    let ctx = json!({"user": {"role": "guest"}});
    assert!(!evaluate_condition("{{user.role}} === 'admin'", &ctx));
    assert!(evaluate_condition("{{user.role}} !== 'admin'", &ctx));
    assert!(evaluate_condition("{{user.role}} === \"guest\"", &ctx));
}

#[test]
fn numeric_comparisons() {
    let ctx = json!({"n": 10, "limit": "5"});
    assert!(evaluate_condition("{{n}} > 5", &ctx));
    assert!(!evaluate_condition("{{n}} < 5", &ctx));
    assert!(evaluate_condition("{{n}} >= 10", &ctx));
    assert!(evaluate_condition("{{n}} <= 10.5", &ctx));
    assert!(evaluate_condition("{{n}} > {{limit}}", &ctx));
}

#[test]
fn string_comparison_is_lexicographic() {
    let ctx = json!({"a": "apple", "b": "banana"});
    assert!(evaluate_condition("{{a}} < {{b}}", &ctx));
    // "10" < "9" as strings
    assert!(evaluate_condition("'10' < '9'", &ctx));
}

#[test]
fn strict_and_loose_equality_follow_javascript() {
    let ctx = json!({"count": 3, "text": "3", "none": null});
    assert!(!evaluate_condition("{{count}} === {{text}}", &ctx));
    assert!(evaluate_condition("{{count}} == {{text}}", &ctx));
    assert!(evaluate_condition("{{none}} == undefined", &ctx));
    assert!(!evaluate_condition("{{none}} === undefined", &ctx));
    assert!(evaluate_condition("{{missing}} === undefined", &ctx));
    assert!(evaluate_condition("1 == true", &ctx));
}

#[test]
fn logical_operators_short_circuit_and_negate() {
    let ctx = json!({"user": {"role": "admin", "active": false}, "items": [1, 2]});
    assert!(evaluate_condition(
        "{{user.role}} === 'admin' && !{{user.active}}",
        &ctx
    ));
    assert!(evaluate_condition(
        "{{user.active}} || {{items.length}} > 1",
        &ctx
    ));
    assert!(!evaluate_condition("!({{user.role}} === 'admin')", &ctx));
    assert!(!evaluate_condition("{{user.active}} && {{user.missing.deep}}", &ctx));
}

#[test]
fn negation_binds_tighter_than_equality() {
    // (!'') === true
    assert!(evaluate_condition("!'' === true", &json!({})));
}

#[test]
fn bare_placeholder_uses_truthiness() {
    let ctx = json!({"flag": "yes", "empty": "", "zero": 0, "obj": {}});
    assert!(evaluate_condition("{{flag}}", &ctx));
    assert!(!evaluate_condition("{{empty}}", &ctx));
    assert!(!evaluate_condition("{{zero}}", &ctx));
    assert!(evaluate_condition("{{obj}}", &ctx));
    assert!(!evaluate_condition("{{absent}}", &ctx));
}

#[test]
fn disallowed_characters_fail_open() {
    let ctx = json!({"n": 1});
    for source in [
        "{{n}} + 1 > 100",
        "{{n}}; alert(1)",
        "{{n}} > 5 ? false : false",
        "false || `x`",
        "{{n}} === -1",
    ] {
        assert!(evaluate_condition(source, &ctx), "{source} should fail open");
        assert!(matches!(
            Condition::parse(source),
            Err(ExprError::DisallowedCharacter(_))
        ));
    }
}

#[test]
fn malformed_conditions_fail_open() {
    let ctx = json!({"n": 1});
    for source in [
        "{{n}} === ",
        "({{n}} > 0",
        "false false",
        "alert('x') === false",
        "{{n}} = 2",
        "'unterminated",
        "{{n",
        "false, false",
    ] {
        assert!(evaluate_condition(source, &ctx), "{source} should fail open");
        assert!(Condition::parse(source).is_err(), "{source} should not parse");
    }
}

#[test]
fn resolved_values_cannot_inject_syntax() {
    let ctx = json!({"name": "x' || true || '"});
    assert!(!evaluate_condition("{{name}} === 'admin'", &ctx));
}

#[test]
fn parsed_condition_is_reusable() {
    let condition = Condition::parse("{{n}} > 5").expect("parse");
    assert!(condition.evaluate(&json!({"n": 10})));
    assert!(!condition.evaluate(&json!({"n": 3})));
}

#[test]
fn binding_substitutes_resolved_paths() {
    let ctx = json!({"user": {"name": "Ada", "age": 36}, "ratio": 0.5, "ok": true});
    assert_eq!(
        resolve_binding("Hi {{ user.name }}, you are {{user.age}}", &ctx),
        "Hi Ada, you are 36"
    );
    assert_eq!(resolve_binding("{{ratio}} {{ok}}", &ctx), "0.5 true");
}

#[test]
fn unresolved_binding_keeps_placeholder_text() {
    let ctx = json!({"user": {"name": "Ada"}});
    assert_eq!(
        resolve_binding("Hello {{user.email}}!", &ctx),
        "Hello {{user.email}}!"
    );
    assert_eq!(
        resolve_binding("{{user.name}} / {{team.name}}", &ctx),
        "Ada / {{team.name}}"
    );
}

#[test]
fn plain_text_passes_through() {
    assert_eq!(resolve_binding("no bindings here", &json!({})), "no bindings here");
    assert_eq!(resolve_binding("{ single }", &json!({})), "{ single }");
}

#[test]
fn binding_of_null_and_objects() {
    let ctx = json!({"nothing": null, "tags": ["a", "b"]});
    assert_eq!(resolve_binding("{{nothing}}", &ctx), "null");
    assert_eq!(resolve_binding("{{tags}}", &ctx), r#"["a","b"]"#);
    assert_eq!(resolve_binding("{{tags.1}}", &ctx), "b");
    assert_eq!(resolve_binding("{{tags.length}}", &ctx), "2");
}

#[test]
fn lookup_stops_at_non_objects() {
    let ctx = json!({"a": {"b": null}, "s": "text"});
    assert!(lookup_path(&ctx, "a.b.c").is_none());
    assert!(lookup_path(&ctx, "s.x").is_none());
    assert!(lookup_path(&ctx, "a..b").is_none());
    assert_eq!(lookup_path(&ctx, "a.b").as_deref(), Some(&json!(null)));
}

#[test]
fn binding_detection() {
    assert!(contains_binding("{{count}} > 0"));
    assert!(contains_binding("{{task.title}}"));
    assert!(!contains_binding("plain"));
}

#[test]
fn deeply_nested_parentheses_fail_open() {
    let source = format!("{}false{}", "(".repeat(3000), ")".repeat(3000));
    assert_eq!(
        Condition::parse(&source),
        Err(ExprError::TooDeep(MAX_DEPTH))
    );
    assert!(evaluate_condition(&source, &json!({})));
}

#[test]
fn long_negation_and_operator_chains_fail_open() {
    let bangs = format!("{}false", "!".repeat(5000));
    assert!(matches!(Condition::parse(&bangs), Err(ExprError::TooDeep(_))));
    assert!(evaluate_condition(&bangs, &json!({})));

    let chain = vec!["false"; 5000].join(" || ");
    assert!(matches!(Condition::parse(&chain), Err(ExprError::TooDeep(_))));
    assert!(evaluate_condition(&chain, &json!({})));
}

#[test]
fn tall_left_operand_counts_towards_the_limit() {
    let grouped = format!("({})", vec!["false"; 100].join(" || "));
    let source = format!("{grouped} || {}", vec!["false"; 30].join(" || "));
    assert!(matches!(Condition::parse(&source), Err(ExprError::TooDeep(_))));

    let fits = format!("{grouped} || {}", vec!["false"; 20].join(" || "));
    assert!(Condition::parse(&fits).is_ok());
}

#[test]
fn moderate_nesting_still_evaluates() {
    let ctx = json!({"done": true});
    let source = format!("{}!{{{{done}}}}{}", "(".repeat(60), ")".repeat(60));
    assert!(!evaluate_condition(&source, &ctx));
    let chain = vec!["false"; 50].join(" || ") + " || {{done}}";
    assert!(evaluate_condition(&chain, &ctx));
}

#[test]
fn hostile_condition_does_not_overflow_a_small_stack() {
    let source = format!("{}true{}", "(".repeat(3000), ")".repeat(3000));
    let handle = std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(move || evaluate_condition(&source, &json!({})))
        .expect("spawn");
    assert!(handle.join().expect("no stack overflow"));
}
