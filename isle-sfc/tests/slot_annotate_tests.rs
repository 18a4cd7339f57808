use isle_sfc::{AnnotateError, AnnotateOptions, ComponentRegistry, annotate_slots, rewrite_slots};

const IMPORT: &str = "import { vforToArray as __vforToArray } from '#app/components/utils'";

fn rewrite(src: &str) -> String {
    rewrite_slots(src, &AnnotateOptions::default())
        .expect("annotate ok")
        .expect("file rewritten")
}

#[test]
fn self_closing_slot_gets_bindings() {
    let src = "<template>\n  <div>\n    <slot name=\"foo\" :bar=\"baz\"/>\n  </div>\n</template>\n<script setup>\nconst a = 1\n</script>\n";
    let out = rewrite(src);
    assert!(out.contains(
        r#"<div style="display: contents;" nuxt-ssr-slot-name="foo" :nuxt-ssr-slot-data="JSON.stringify([{ bar: baz }])"/>"#
    ));
    assert!(!out.contains("<slot"));
    assert!(!out.contains("fallback"));
    assert!(out.contains(&format!("<script setup>\n{IMPORT}\nconst a = 1\n</script>")));
}

#[test]
fn several_fallback_children_are_wrapped() {
    let src = r#"<template><slot name="a"><p>one</p><p>two</p></slot></template>"#;
    let expected = format!(
        "<script setup>\n{IMPORT}\n</script>\n<template>{}{}{}{}{}</template>",
        r#"<div style="display: contents;" nuxt-ssr-slot-name="a" :nuxt-ssr-slot-data="JSON.stringify([{}])">"#,
        r#"<div nuxt-slot-fallback-start="a"/><div style="display: contents;">"#,
        "<p>one</p><p>two</p>",
        r#"</div><div nuxt-slot-fallback-end="a"/>"#,
        "</div>",
    );
    assert_eq!(rewrite(src), expected);
}

#[test]
fn single_fallback_child_takes_the_loop() {
    let src = r#"<template><ul><slot v-for="item in items" :item="item"><li>{{ item }}</li></slot></ul></template>"#;
    let out = rewrite(src);
    let expected_template = format!(
        "<template><ul>{}{}{}{}</div></ul></template>",
        r#"<div style="display: contents;" nuxt-ssr-slot-name="default" :nuxt-ssr-slot-data="JSON.stringify(__vforToArray(items).map(item => ({ item: item })))">"#,
        r#"<div nuxt-slot-fallback-start="default"/>"#,
        r#"<li v-for="item in items">{{ item }}</li>"#,
        r#"<div nuxt-slot-fallback-end="default"/>"#,
    );
    assert!(out.ends_with(&expected_template), "got {out}");
}

#[test]
fn whitespace_does_not_count_as_fallback() {
    let src = "<template><slot>\n   \n</slot></template>";
    let out = rewrite(src);
    assert!(!out.contains("nuxt-slot-fallback-start"));
    assert!(out.contains("nuxt-ssr-slot-name=\"default\""));
}

#[test]
fn bind_object_is_spread_and_static_attrs_are_strings() {
    let out = rewrite(r#"<template><slot v-bind="attrs" title="Hi" :item-id="id"/></template>"#);
    assert!(
        out.contains(r#":nuxt-ssr-slot-data="JSON.stringify([{ ...(attrs), title: `Hi`, 'item-id': id }])""#),
        "got {out}"
    );
}

#[test]
fn dynamic_slot_names_stay_bound() {
    let out = rewrite(r#"<template><slot :name="tab">x</slot></template>"#);
    assert!(out.contains(r#":nuxt-ssr-slot-name="tab""#));
    assert!(out.contains(r#"<div :nuxt-slot-fallback-start="tab"/>x<div :nuxt-slot-fallback-end="tab"/>"#));
}

#[test]
fn files_without_slots_are_untouched() {
    let src = "<template><div>no slots here, not even <slotted-thing/></div></template>";
    assert_eq!(rewrite_slots(src, &AnnotateOptions::default()).unwrap(), None);
    assert_eq!(rewrite_slots("<slot/>", &AnnotateOptions::default()).unwrap(), None);
}

#[test]
fn bad_loop_expression_is_reported() {
    let err = rewrite_slots(
        r#"<template><slot v-for="items"/></template>"#,
        &AnnotateOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, AnnotateError::Template(_)));
}

#[test]
fn only_islands_are_annotated() {
    let registry = ComponentRegistry::from_json(
        r#"[
            { "pascalName": "Card", "filePath": "/app/Card.vue", "island": true },
            { "pascalName": "Menu", "filePath": "/app/Menu.server.vue", "mode": "server" },
            { "pascalName": "Menu", "filePath": "/app/Menu.client.vue", "mode": "client" },
            { "pascalName": "Clock", "filePath": "/app/Clock.server.vue", "mode": "server" }
        ]"#,
    )
    .unwrap();
    let src = "<template><slot/></template>";
    let options = AnnotateOptions::default();

    assert!(annotate_slots(src, "/app/Card.vue?vue&type=template", &registry, &options).unwrap().is_some());
    assert!(annotate_slots(src, "/app/Clock.server.vue", &registry, &options).unwrap().is_some());
    assert!(annotate_slots(src, "/app/Menu.server.vue", &registry, &options).unwrap().is_none());
    assert!(annotate_slots(src, "/app/Other.vue", &registry, &options).unwrap().is_none());
}

#[test]
fn slots_next_to_named_slot_templates() {
    let src = "<template>\n  <div>\n    <Comp>\n      <template #a>x</template>\n      <template #b>y</template>\n    </Comp>\n    <slot name=\"foo\" :bar=\"baz\"/>\n  </div>\n</template>\n<script setup>\nconst baz = 1\n</script>\n";
    let out = rewrite(src);
    assert!(out.contains(r#"nuxt-ssr-slot-name="foo" :nuxt-ssr-slot-data="JSON.stringify([{ bar: baz }])"/>"#));
    assert!(out.contains("<template #a>x</template>\n      <template #b>y</template>"));
}

#[test]
fn broken_interpolation_next_to_a_slot_is_an_error() {
    let err = rewrite_slots("<template><slot/>{{ é</template>", &AnnotateOptions::default())
        .unwrap_err();
    assert!(matches!(err, AnnotateError::Template(_)));
}

#[test]
fn slot_tag_check_accepts_bare_slots() {
    let out = rewrite("<template><slot/></template>");
    assert!(out.contains(r#"nuxt-ssr-slot-name="default""#));

    let out = rewrite("<template><div><slot>x</slot></div></template>");
    assert!(out.contains(r#"nuxt-slot-fallback-start="default""#));
    assert!(!out.contains("<slot"));

    let src = "<template><slot-machine/><slotted/></template>";
    assert_eq!(rewrite_slots(src, &AnnotateOptions::default()).unwrap(), None);
}
