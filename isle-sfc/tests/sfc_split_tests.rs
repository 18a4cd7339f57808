use isle_sfc::parse_sfc;

#[test]
fn splits_basic_sfc() {
    let src = r#"
<template id="root">
  <div class="app">{{ count }}</div>
</template>
<script setup lang="ts">
  // setup
</script>
<script>
  // regular script
</script>
<style scoped>
  .app { color: red; }
</style>
"#;

    let sfc = parse_sfc(src).expect("parse ok");
    let tpl = sfc.template.as_ref().expect("template");
    assert!(tpl.content.contains("{{ count }}"));
    assert!(
        tpl.attrs
            .iter()
            .any(|a| a.name == "id" && a.value.as_deref() == Some("root"))
    );
    assert_eq!(&src[tpl.open_end - 1..tpl.open_end], ">");

    let ss = sfc.script_setup.as_ref().expect("script_setup");
    assert!(ss.setup);
    assert!(ss.block.content.contains("// setup"));

    let sc = sfc.script.as_ref().expect("script");
    assert!(!sc.setup);
    assert!(sc.block.content.contains("regular script"));

    // the setup block comes first in the file
    assert!(sfc.first_script().expect("a script").setup);

    let st = sfc.style.expect("style");
    assert!(st.content.contains(".app"));
    assert!(st.attrs.iter().any(|a| a.name == "scoped"));
}

#[test]
fn nested_template_tags_stay_in_the_body() {
    let src = "<template>\n  <Foo>\n    <template #header>hi</template>\n  </Foo>\n</template>\n<script>\nexport default {}\n</script>\n";
    let sfc = parse_sfc(src).expect("parse ok");
    let tpl = sfc.template.expect("template");
    assert!(tpl.content.contains("<template #header>hi</template>"));
    assert!(tpl.content.contains("</Foo>"));
}

#[test]
fn sibling_slot_templates_do_not_end_the_block() {
    let src = "<template>\n  <Comp>\n    <template #a>x</template>\n    <template v-slot:b=\"{ item }\">{{ item > 1 }}</template>\n  </Comp>\n  <template v-if=\"ok\"/>\n</template>\n<script setup>\nconst ok = true\n</script>\n";
    let sfc = parse_sfc(src).expect("parse ok");
    let tpl = sfc.template.expect("template");
    assert!(tpl.content.ends_with("<template v-if=\"ok\"/>\n"));
    assert!(tpl.content.contains("<template #a>x</template>"));
    assert!(tpl.content.contains("</Comp>"));
    assert!(sfc.script_setup.expect("script setup").block.content.contains("const ok"));
}

#[test]
fn custom_blocks_are_skipped() {
    let src = "<i18n lang=\"json\">{ \"en\": {} }</i18n>\n<template><div/></template>\n";
    let sfc = parse_sfc(src).expect("parse ok");
    assert_eq!(sfc.template.as_ref().expect("template").content, "<div/>");
    assert!(sfc.first_script().is_none());
}

#[test]
fn stray_text_is_an_error() {
    assert!(parse_sfc("just some text").is_err());
}
