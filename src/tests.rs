#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use serde_json::json;

    use crate::core::processors::{ProcessorKind, ProcessorResult, Step};
    use crate::errors::{ExpressionError, TemplateError};
    use crate::{DefaultBridge, Engine, EngineConfig, Node, Value};

    fn init() {
        let _ = env_logger::builder().is_test(true).filter_level(log::LevelFilter::Trace).try_init();
    }

    fn parse(engine: &Engine, markup: &str) -> Node {
        engine.bridge().parse_markup(markup).unwrap()
    }

    fn recorder(
        log: Rc<RefCell<Vec<&'static str>>>,
        name: &'static str,
    ) -> impl Fn(&mut Step<'_>, &str) -> Result<ProcessorResult, TemplateError> {
        move |_step, _expression| {
            log.borrow_mut().push(name);
            Ok(ProcessorResult::Continue)
        }
    }

    #[test]
    fn test_alternation() {
        init();
        let mut engine = Engine::default();
        engine.set_global("foo", Value::Undefined);

        assert_eq!(engine.evaluate_expression("foo | 'bar'").unwrap(), Value::from("bar"));
        assert_eq!(engine.evaluate_expression("0 | 1").unwrap(), Value::from(0));
        assert_eq!(
            engine.evaluate(&["missing".to_string(), "false".to_string(), "1".to_string()]).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_repeat() {
        init();
        let mut engine = Engine::default();

        let output = engine.render_markup(r#"<ul><li tal:repeat="x [10,20,30]">${x}</li></ul>"#).unwrap();
        assert_eq!(output, "<ul><li>10</li><li>20</li><li>30</li></ul>");

        let output = engine
            .render_markup(r#"<ul><li tal:repeat="x [10,20,30]">${repeat.x.number}</li></ul>"#)
            .unwrap();
        assert_eq!(output, "<ul><li>1</li><li>2</li><li>3</li></ul>");
    }

    #[test]
    fn test_repeat_metadata() {
        init();
        let mut engine = Engine::default();
        engine.set_global("items", Value::from(json!(["a", "b", "c", "d"])));

        let output = engine
            .render_markup(
                "<p><i tal:repeat=\"item items\">${repeat.item.index}/${repeat.item.number}/\
                 ${repeat.item.even}/${repeat.item.odd}/${repeat.item.start}/${repeat.item.end}/\
                 ${repeat.item.length}/${repeat.item.key}</i></p>",
            )
            .unwrap();
        assert_eq!(
            output,
            "<p><i>0/1/true/false/true/false/4/0</i>\
             <i>1/2/false/true/false/false/4/1</i>\
             <i>2/3/true/false/false/false/4/2</i>\
             <i>3/4/false/true/false/true/4/3</i></p>"
        );
    }

    #[test]
    fn test_repeat_over_maps_and_nested_loops() {
        init();
        let mut engine = Engine::default();
        engine.set_global("prices", Value::from(json!({"pear": 2, "apple": 1})));

        let output = engine
            .render_markup(r#"<dl><dt tal:repeat="p prices">${repeat.p.key}=${p}</dt></dl>"#)
            .unwrap();
        assert_eq!(output, "<dl><dt>apple=1</dt><dt>pear=2</dt></dl>");

        let output = engine
            .render_markup(
                r#"<div><p tal:repeat="row range(2)"><b tal:repeat="col range(2)">${repeat.row.index}${repeat.col.index}</b></p></div>"#,
            )
            .unwrap();
        assert_eq!(output, "<div><p><b>00</b><b>01</b></p><p><b>10</b><b>11</b></p></div>");

        let output = engine.render_markup(r#"<ul><li tal:repeat="x nothing">x</li></ul>"#).unwrap();
        assert_eq!(output, "<ul></ul>");
    }

    #[test]
    fn test_condition() {
        init();
        let mut engine = Engine::default();
        engine.set_global("yes", Value::from(true));

        let output = engine
            .render_markup(r#"<div><span tal:condition="missing.path">hi</span><b tal:condition="yes">ok</b></div>"#)
            .unwrap();
        assert_eq!(output, "<div><!----><b>ok</b></div>");
    }

    #[test]
    fn test_escaped_interpolation() {
        init();
        let mut engine = Engine::default();
        engine.set_global("foo", Value::from("value"));

        assert_eq!(engine.render_markup("<p>$${foo}</p>").unwrap(), "<p>${foo}</p>");
        assert_eq!(engine.render_markup("<p>${foo} &amp; ${1 + 1}</p>").unwrap(), "<p>value &amp; 2</p>");
        assert_eq!(
            engine.render_markup(r#"<a href="/u/${foo}" title="${nothing}">x</a>"#).unwrap(),
            r#"<a href="/u/value" title="">x</a>"#
        );
    }

    #[test]
    fn test_mixed_escaped_and_live_interpolation() {
        init();
        let mut engine = Engine::default();
        engine.set_global("a", Value::from("A"));
        engine.set_global("b", Value::from("B"));

        assert_eq!(engine.render_markup("<p>$${a} ${b}</p>").unwrap(), "<p>${a} B</p>");
        assert_eq!(engine.render_markup("<p>${a}$${b}${b}</p>").unwrap(), "<p>A${b}B</p>");
        assert_eq!(
            engine.render_markup(r#"<a title="$${a} ${b}">x</a>"#).unwrap(),
            r#"<a title="${a} B">x</a>"#
        );
    }

    #[test]
    fn test_double_pipe_inside_interpolation() {
        init();
        let mut engine = Engine::default();
        engine.set_global("zero", Value::from(0));
        engine.set_global("b", Value::from("B"));

        // `||` is a logical or, so a falsy left side falls through to the right.
        assert_eq!(engine.render_markup("<p>${zero || b}</p>").unwrap(), "<p>B</p>");
        assert_eq!(engine.render_markup("<p>${zero | b}</p>").unwrap(), "<p>0</p>");
        assert_eq!(engine.render_markup("<p>${missing || 'x'}</p>").unwrap(), "<p>x</p>");
    }

    #[test]
    fn test_interpolation_syntax_in_data_stays_literal() {
        init();
        let mut engine = Engine::default();
        engine.set_global("t", Value::from("${secret}"));
        engine.set_global("secret", Value::from("LEAKED"));

        assert_eq!(
            engine.render_markup(r#"<a tal:attributes="title t">x</a>"#).unwrap(),
            r#"<a title="${secret}">x</a>"#
        );
        assert_eq!(engine.render_markup(r#"<p tal:content="t">x</p>"#).unwrap(), "<p>${secret}</p>");
        assert_eq!(engine.render_markup("<p>${t}</p>").unwrap(), "<p>${secret}</p>");
        assert_eq!(engine.render_markup(r#"<a title="${t}">x</a>"#).unwrap(), r#"<a title="${secret}">x</a>"#);

        // Authored attributes next to assigned ones are still interpolated.
        assert_eq!(
            engine
                .render_markup(r#"<a href="/${secret}" tal:attributes="title t; class default" class="c-${secret}">x</a>"#)
                .unwrap(),
            r#"<a href="/LEAKED" class="c-LEAKED" title="${secret}">x</a>"#
        );
    }

    #[test]
    fn test_boolean_attributes() {
        init();
        let mut engine = Engine::default();
        let markup = r#"<input type="checkbox" tal:attributes="checked isActive">"#;

        engine.set_global("isActive", Value::from(true));
        assert_eq!(engine.render_markup(markup).unwrap(), r#"<input type="checkbox" checked="checked">"#);

        engine.set_global("isActive", Value::from(false));
        assert_eq!(engine.render_markup(markup).unwrap(), r#"<input type="checkbox">"#);
    }

    #[test]
    fn test_attribute_list() {
        init();
        let mut engine = Engine::default();
        engine.set_global("id", Value::from(7));

        let output = engine
            .render_markup(
                r#"<a class="old" data-x="1" title="t" tal:attributes="class 'new'; data-x: nothing, title = default; href '/item/' + id">x</a>"#,
            )
            .unwrap();
        assert_eq!(output, r#"<a class="new" title="t" href="/item/7">x</a>"#);
    }

    #[test]
    fn test_processor_order() {
        init();
        let mut engine = Engine::default();
        let log = Rc::new(RefCell::new(Vec::new()));
        engine.register_processor("a", 30, ProcessorKind::Default, recorder(Rc::clone(&log), "a"));
        engine.register_processor("b", 10, ProcessorKind::Default, recorder(Rc::clone(&log), "b"));
        engine.register_processor("c", 20, ProcessorKind::Default, recorder(Rc::clone(&log), "c"));
        let builtins = 7;
        assert_eq!(engine.processors().len(), builtins + 3);

        engine.render_markup(r#"<p tal:a="" tal:c="" tal:b="">x</p>"#).unwrap();
        assert_eq!(*log.borrow(), vec!["b", "c", "a"]);

        log.borrow_mut().clear();
        engine.register_processor("a", 5, ProcessorKind::Default, recorder(Rc::clone(&log), "a"));
        assert_eq!(engine.processors().len(), builtins + 3);
        engine.render_markup(r#"<p tal:a="" tal:c="" tal:b="">x</p>"#).unwrap();
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);

        let names: Vec<&str> = engine.processors().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["a", "b", "c", "define", "condition", "repeat", "replace", "content", "attributes", "omit-tag"]
        );
    }

    #[test]
    fn test_builtin_order_define_before_condition() {
        init();
        let mut engine = Engine::default();
        let output = engine
            .render_markup(r#"<div><p tal:condition="n > 1" tal:define="n 2">${n}</p></div>"#)
            .unwrap();
        assert_eq!(output, "<div><p>2</p></div>");
    }

    #[test]
    fn test_idempotence() {
        init();
        let mut engine = Engine::default();
        engine.set_global("items", Value::from(json!([1, 2])));
        engine.set_global("title", Value::from("T"));

        let root = parse(
            &engine,
            r#"<main><h1 tal:content="title">x</h1><ul><li tal:repeat="i items">${i}</li></ul><p tal:condition="false">gone</p></main>"#,
        );
        let first = engine.process(root).unwrap();
        let second = engine.process(first.clone()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.to_markup(), second.to_markup());
    }

    #[test]
    fn test_scope_discipline() {
        init();
        let mut engine = Engine::default();
        let output = engine
            .render_markup(
                r#"<div><section tal:define="inner 'L'; global shared 'G'"><i>${inner}</i></section><b>${inner | 'none'}</b><u>${shared}</u></div>"#,
            )
            .unwrap();
        assert_eq!(output, "<div><section><i>L</i></section><b>none</b><u>G</u></div>");
        assert_eq!(engine.scope().depth(), 1);
        assert_eq!(engine.get_variable("inner"), None);
        assert_eq!(engine.get_variable("shared"), Some(Value::from("G")));
    }

    #[test]
    fn test_define_captures_rendered_children() {
        init();
        let mut engine = Engine::default();
        let output = engine
            .render_markup(r#"<main><div tal:define="global captured"><b>${1 + 1}</b></div><p tal:content="captured">x</p></main>"#)
            .unwrap();
        assert_eq!(output, "<main><div><b>2</b></div><p><b>2</b></p></main>");
    }

    #[test]
    fn test_replace_content_and_omit_tag() {
        init();
        let mut engine = Engine::default();
        engine.set_global("v", Value::from(1));

        let cases = [
            (r#"<div><span tal:replace="'x'">old</span></div>"#, "<div>x</div>"),
            (r#"<div><span tal:replace="nothing">old</span></div>"#, "<div><!----></div>"),
            (r#"<div><span tal:replace="default">${v}</span></div>"#, "<div><span>1</span></div>"),
            (r#"<p tal:content="default">keep ${v}</p>"#, "<p>keep 1</p>"),
            (r#"<p tal:content="nothing">gone</p>"#, "<p></p>"),
            (r#"<p tal:content="'<b>'">x</p>"#, "<p>&lt;b&gt;</p>"),
            (r#"<p tal:content="structure: '<b>x</b>'">y</p>"#, "<p><b>x</b></p>"),
            (r#"<p tal:content="html: '<i>${v}</i>'">y</p>"#, "<p><i>${v}</i></p>"),
            (r#"<div tal:omit-tag=""><b>${v}</b></div>"#, "<b>1</b>"),
            (r#"<div tal:omit-tag="v > 5">a</div>"#, "<div>a</div>"),
        ];
        for (markup, expected) in cases {
            assert_eq!(engine.render_markup(markup).unwrap(), expected, "rendering {}", markup);
        }
    }

    #[test]
    fn test_templates() {
        init();
        let bridge = DefaultBridge::new().with_template("card", r#"<b tal:content="title">t</b>"#);
        let mut engine = Engine::new(bridge);
        engine.set_global("title", Value::from("Hello"));
        engine.set_global("which", Value::from("card"));

        assert_eq!(engine.render_markup(r#"<div tal:content="tpl: card">x</div>"#).unwrap(), "<div><b>Hello</b></div>");
        assert_eq!(engine.render_markup(r#"<div tal:replace="tpl: which">x</div>"#).unwrap(), "<b>Hello</b>");

        let err = engine.render_markup(r#"<div tal:content="tpl: absent">x</div>"#).unwrap_err();
        assert!(matches!(err, TemplateError::TemplateLoad { ref name, .. } if name == "absent"));
    }

    #[test]
    fn test_custom_processor_and_unregister() {
        init();
        let mut engine = Engine::default();
        engine.register_processor(
            "shout",
            550,
            ProcessorKind::Content,
            |step: &mut Step<'_>, expression: &str| -> Result<ProcessorResult, TemplateError> {
                let text = step.evaluate(expression)?.to_text().to_uppercase();
                step.element.children = vec![Node::text(text)];
                Ok(ProcessorResult::Skip)
            },
        );
        engine.set_global("word", Value::from("hi"));
        assert_eq!(engine.render_markup(r#"<p tal:shout="word">x</p>"#).unwrap(), "<p>HI</p>");

        assert!(engine.unregister_processor("condition"));
        assert!(!engine.unregister_processor("condition"));
        assert_eq!(
            engine.render_markup(r#"<b tal:condition="false">x</b>"#).unwrap(),
            r#"<b tal:condition="false">x</b>"#
        );
    }

    #[test]
    fn test_custom_namespace() {
        init();
        let config = EngineConfig::from_json(r#"{"namespace": "data-"}"#).unwrap();
        let mut engine = Engine::with_config(config, DefaultBridge::new());
        assert_eq!(engine.render_markup(r#"<p data-content="'x'">y</p>"#).unwrap(), "<p>x</p>");
        assert_eq!(
            engine.render_markup(r#"<p tal:content="'x'">y</p>"#).unwrap(),
            r#"<p tal:content="'x'">y</p>"#
        );
    }

    #[test]
    fn test_processor_errors_propagate() {
        init();
        let mut engine = Engine::default();
        let err = engine.render_markup(r#"<p tal:content="'unterminated">x</p>"#).unwrap_err();
        assert!(matches!(err, TemplateError::Expression(ExpressionError::Syntax { .. })));

        let err = engine.render_markup(r#"<p tal:content="missing">x</p>"#).unwrap_err();
        assert!(matches!(err, TemplateError::UndefinedValue(_)));

        engine.set_global("repeat", Value::from(5));
        let err = engine.render_markup(r#"<p tal:repeat="x [1]">x</p>"#).unwrap_err();
        assert!(matches!(err, TemplateError::Expression(ExpressionError::NonExtendableType(_))));
        assert_eq!(engine.scope().depth(), 1);
    }

    #[test]
    fn test_scope_api() {
        init();
        let mut engine = Engine::default();
        engine.set_variable("x", Value::from(1));
        engine.push_scope();
        engine.set_variable("x", Value::from(2));
        assert_eq!(engine.evaluate_expression("x").unwrap(), Value::from(2));
        engine.pop_scope();
        assert_eq!(engine.evaluate_expression("x").unwrap(), Value::from(1));

        engine.set_environment("fallback", Value::from("env"));
        assert_eq!(engine.evaluate_expression("fallback").unwrap(), Value::from("env"));
        engine.set_scope(Default::default());
        assert!(engine.evaluate_expression("x").is_err());
    }

    #[test]
    fn test_reactive_content() {
        init();
        let mut engine = Engine::default();
        engine.set_global("name", Value::from("Ada"));

        let root = parse(&engine, r#"<div><h1 tal:content="name">x</h1><p>static</p></div>"#);
        let mut root = engine.process(root).unwrap();
        assert_eq!(root.to_markup(), "<div><h1>Ada</h1><p>static</p></div>");
        assert_eq!(engine.binding_count(), 1);
        let static_id = root.children()[1].id();

        let reruns = engine.update(&mut root, "name", Value::from("Grace")).unwrap();
        assert_eq!(reruns, 1);
        assert_eq!(root.to_markup(), "<div><h1>Grace</h1><p>static</p></div>");
        assert_eq!(root.children()[1].id(), static_id);
        assert_eq!(engine.binding_count(), 1);

        let mut fresh = Engine::default();
        fresh.set_global("name", Value::from("Grace"));
        let expected = fresh.render_markup(r#"<div><h1 tal:content="name">x</h1><p>static</p></div>"#).unwrap();
        assert_eq!(root.to_markup(), expected);

        assert_eq!(engine.invalidate(&mut root, &["unrelated"]).unwrap(), 0);
    }

    #[test]
    fn test_reactive_text_and_local_scope() {
        init();
        let mut engine = Engine::default();
        engine.set_global("who", Value::from("world"));

        let root = parse(&engine, r#"<div tal:define="greeting 'Hello'"><p>${greeting}, ${who}!</p></div>"#);
        let mut root = engine.process(root).unwrap();
        assert_eq!(root.to_markup(), "<div><p>Hello, world!</p></div>");

        engine.update(&mut root, "who", Value::from("there")).unwrap();
        assert_eq!(root.to_markup(), "<div><p>Hello, there!</p></div>");
    }

    #[test]
    fn test_reactive_condition_toggles() {
        init();
        let mut engine = Engine::default();
        engine.set_global("show", Value::from(false));

        let root = parse(&engine, r#"<div><b tal:condition="show">on</b><i>after</i></div>"#);
        let mut root = engine.process(root).unwrap();
        assert_eq!(root.to_markup(), "<div><!----><i>after</i></div>");

        engine.update(&mut root, "show", Value::from(true)).unwrap();
        assert_eq!(root.to_markup(), "<div><b>on</b><i>after</i></div>");

        engine.update(&mut root, "show", Value::from(false)).unwrap();
        assert_eq!(root.to_markup(), "<div><!----><i>after</i></div>");
        assert_eq!(engine.binding_count(), 1);
    }

    #[test]
    fn test_reactive_repeat() {
        init();
        let mut engine = Engine::default();
        engine.set_global("items", Value::from(json!([1, 2])));

        let root = parse(&engine, r#"<ul><li tal:repeat="x items">${x}</li></ul>"#);
        let mut root = engine.process(root).unwrap();
        assert_eq!(root.to_markup(), "<ul><li>1</li><li>2</li></ul>");

        engine.update(&mut root, "items", Value::from(json!([1, 2, 3]))).unwrap();
        assert_eq!(root.to_markup(), "<ul><li>1</li><li>2</li><li>3</li></ul>");

        engine.update(&mut root, "items", Value::List(vec![])).unwrap();
        assert_eq!(root.to_markup(), "<ul><!----></ul>");

        engine.update(&mut root, "items", Value::from(json!([7]))).unwrap();
        assert_eq!(root.to_markup(), "<ul><li>7</li></ul>");

        // The repeat itself plus the `${x}` of its single item.
        assert_eq!(engine.binding_count(), 2);
        assert_eq!(engine.prune_bindings(&root), 0);
    }

    #[test]
    fn test_rerenders_drop_the_bindings_they_replace() {
        init();
        let mut engine = Engine::default();
        engine.set_global("items", Value::from(json!([1, 2, 3])));
        engine.set_global("suffix", Value::from("!"));

        let root = parse(&engine, r#"<ul><li tal:repeat="x items">${x}${suffix}</li></ul>"#);
        let mut root = engine.process(root).unwrap();
        assert_eq!(engine.binding_count(), 4);

        for _ in 0..5 {
            engine.update(&mut root, "items", Value::from(json!([1, 2, 3]))).unwrap();
        }
        assert_eq!(engine.binding_count(), 4);
        assert_eq!(root.to_markup(), "<ul><li>1!</li><li>2!</li><li>3!</li></ul>");

        // The repeat reads `suffix` through its items and runs first; the
        // text bindings it replaces never fire.
        assert_eq!(engine.update(&mut root, "suffix", Value::from("?")).unwrap(), 1);
        assert_eq!(root.to_markup(), "<ul><li>1?</li><li>2?</li><li>3?</li></ul>");
        assert_eq!(engine.binding_count(), 4);
    }

    #[test]
    fn test_reactive_dependencies_follow_the_taken_branch() {
        init();
        let mut engine = Engine::default();
        engine.set_global("flag", Value::from(true));
        engine.set_global("a", Value::from("A"));
        engine.set_global("b", Value::from("B"));

        let root = parse(&engine, r#"<p tal:content="flag ? a : b">x</p>"#);
        let mut root = engine.process(root).unwrap();
        assert_eq!(root.to_markup(), "<p>A</p>");
        assert_eq!(engine.update(&mut root, "b", Value::from("B2")).unwrap(), 0);

        engine.update(&mut root, "flag", Value::from(false)).unwrap();
        assert_eq!(root.to_markup(), "<p>B2</p>");
        assert_eq!(engine.update(&mut root, "b", Value::from("B3")).unwrap(), 1);
        assert_eq!(root.to_markup(), "<p>B3</p>");
        assert_eq!(engine.update(&mut root, "a", Value::from("A2")).unwrap(), 0);
    }

    #[test]
    fn test_reactive_nested_bindings() {
        init();
        let mut engine = Engine::default();
        engine.set_global("show", Value::from(true));
        engine.set_global("name", Value::from("Ada"));

        let root = parse(&engine, r#"<main><div tal:condition="show"><span tal:content="name">x</span></div></main>"#);
        let mut root = engine.process(root).unwrap();
        assert_eq!(engine.binding_count(), 2);

        engine.update(&mut root, "show", Value::from(false)).unwrap();
        assert_eq!(root.to_markup(), "<main><!----></main>");

        // The span binding went away with the div it was rendered into.
        assert_eq!(engine.binding_count(), 1);
        assert_eq!(engine.update(&mut root, "name", Value::from("Grace")).unwrap(), 0);
        assert_eq!(engine.binding_count(), 1);

        engine.update(&mut root, "show", Value::from(true)).unwrap();
        assert_eq!(root.to_markup(), "<main><div><span>Grace</span></div></main>");
        assert_eq!(engine.update(&mut root, "name", Value::from("Lin")).unwrap(), 1);
        assert_eq!(root.to_markup(), "<main><div><span>Lin</span></div></main>");
    }

    #[test]
    fn test_reactive_root_replacement() {
        init();
        let mut engine = Engine::default();
        engine.set_global("label", Value::from("one"));

        let root = parse(&engine, r#"<b tal:replace="label">x</b>"#);
        let mut root = engine.process(root).unwrap();
        assert_eq!(root.to_markup(), "one");

        engine.update(&mut root, "label", Value::from("two")).unwrap();
        assert_eq!(root.to_markup(), "two");
    }

    #[test]
    fn test_detached_bindings_dispose_themselves() {
        init();
        let mut engine = Engine::default();
        engine.set_global("name", Value::from("Ada"));

        let root = parse(&engine, r#"<h1 tal:content="name">x</h1>"#);
        engine.process(root).unwrap();
        assert_eq!(engine.binding_count(), 1);

        let mut other = Node::text("unrelated");
        assert_eq!(engine.update(&mut other, "name", Value::from("Grace")).unwrap(), 0);
        assert_eq!(engine.binding_count(), 0);
        assert_eq!(other.to_markup(), "unrelated");
    }

    #[test]
    fn test_non_reactive_engine_keeps_no_bindings() {
        init();
        let mut config = EngineConfig::default();
        config.set_reactive(false);
        let mut engine = Engine::with_config(config, DefaultBridge::new());
        engine.set_global("name", Value::from("Ada"));

        let root = parse(&engine, r#"<h1 tal:content="name">x</h1>"#);
        let mut root = engine.process(root).unwrap();
        assert_eq!(engine.binding_count(), 0);
        assert_eq!(engine.update(&mut root, "name", Value::from("Grace")).unwrap(), 0);
        assert_eq!(root.to_markup(), "<h1>Ada</h1>");
    }
}
