//! End-to-end tests for the generation pipeline.
//!
//! Each test feeds C# units and stylesheet texts through `Generator::run` and
//! checks the generated sources and the pass report.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::error::GeneratorError;
    use crate::model::{AdditionalText, Capability, EmitterKind, SyntaxUnit};
    use crate::options::GeneratorOptions;
    use crate::pipeline::{generate, CancellationToken, GenerationOutput, Generator};

    const USINGS: &str = "using Ostomachion.Blazor.WebComponents;\nusing Microsoft.AspNetCore.Components;\n";

    fn unit(path: &str, body: &str) -> SyntaxUnit {
        SyntaxUnit::new(path, format!("{}{}", USINGS, body))
    }

    fn run(units: &[SyntaxUnit], texts: &[AdditionalText]) -> GenerationOutput {
        generate(units, texts, GeneratorOptions::default()).unwrap()
    }

    fn source<'a>(output: &'a GenerationOutput, hint: &str) -> &'a str {
        output
            .sources
            .iter()
            .find(|s| s.hint_name == hint)
            .map(|s| s.text.as_str())
            .unwrap_or_else(|| panic!("missing {}", hint))
    }

    fn hints(output: &GenerationOutput) -> Vec<&str> {
        output.sources.iter().map(|s| s.hint_name.as_str()).collect()
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // SCENARIOS
    // ═══════════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_toast_end_to_end() {
        let output = run(
            &[unit(
                "Toast.razor.cs",
                "namespace App;\npublic partial class Toast : WebComponentBase\n{\n    [Slot] public string Message { get; set; } = \"\";\n}\n",
            )],
            &[AdditionalText::new("Toast.razor.css", ":host{color:red}")],
        );

        assert_eq!(
            hints(&output),
            vec![
                "App.Toast.CustomElement.g.cs",
                "App.Toast.Slots.g.cs",
                "App.Toast.Stylesheet.g.cs"
            ]
        );

        let common = source(&output, "App.Toast.CustomElement.g.cs");
        assert!(common.contains("namespace App;"));
        assert!(common.contains("partial class Toast : global::Ostomachion.Blazor.WebComponents.ICustomElement"));

        let slots = source(&output, "App.Toast.Slots.g.cs");
        assert!(slots.contains(
            "        builder.OpenElement(0, \"span\");\n        builder.AddAttribute(1, \"slot\", \"Message\");\n        builder.AddContent(2, this.Message);\n        builder.CloseElement();\n"
        ));

        let stylesheet = source(&output, "App.Toast.Stylesheet.g.cs");
        assert!(stylesheet.contains("protected override string? Stylesheet => \":host{color:red}\";"));

        let report = &output.report.declarations[0];
        assert_eq!(report.declaration.capability, Capability::WebComponent);
        assert_eq!(
            report.association.as_ref().and_then(|a| a.stylesheet_path.as_deref()),
            Some("Toast.razor.css")
        );
    }

    #[test]
    fn test_local_name_conflict_keeps_first() {
        let output = run(
            &[
                unit(
                    "Toast.A.cs",
                    "namespace App;\n[CustomElement(Extends = \"x-toast-a\")]\npublic partial class Toast : CustomElementBase { }",
                ),
                unit(
                    "Toast.B.cs",
                    "namespace App;\n[CustomElement(Extends = \"x-toast-b\")]\npublic partial class Toast { }",
                ),
            ],
            &[],
        );

        assert_eq!(hints(&output), vec!["App.Toast.CustomElement.g.cs"]);
        assert!(source(&output, "App.Toast.CustomElement.g.cs").contains("LocalName => \"x-toast-a\";"));
        assert_eq!(output.report.conflicts.len(), 1);
        assert_eq!(output.report.conflicts[0].ignored, "x-toast-b");
        assert_eq!(output.report.conflicts[0].ignored_path, "Toast.B.cs");
    }

    #[test]
    fn test_front_end_intermediate_and_code_behind_merge() {
        let intermediate = SyntaxUnit::new(
            "obj/Debug/net8.0/Components/Toast.razor.g.cs",
            "#pragma checksum \"/src/App/Components/Toast.razor\" \"{8829d00f-11b8-4213-878b-770e8597ac16}\" \"ab\"\n\
             // <auto-generated/>\n\
             namespace App.Components\n{\n    public partial class Toast : global::Ostomachion.Blazor.WebComponents.WebComponentBase\n    {\n    }\n}\n",
        );
        let code_behind = unit(
            "/src/App/Components/Toast.razor.cs",
            "namespace App.Components;\npublic partial class Toast\n{\n    [Slot(\"title\", RootElement = \"h2\")] public string? Title { get; set; }\n    [Slot(IsTemplated = true)] public RenderFragment? Body { get; set; }\n}\n",
        );
        let output = run(
            &[intermediate, code_behind],
            &[AdditionalText::new("/src/App/Components/Toast.razor.css", "h2{}")],
        );

        let report = &output.report.declarations[0];
        assert_eq!(output.report.declarations.len(), 1);
        assert_eq!(
            report.declaration.original_paths,
            vec!["/src/App/Components/Toast.razor", "/src/App/Components/Toast.razor.cs"]
        );
        let association = report.association.as_ref().unwrap();
        assert!(association.has_front_end_fragment);
        assert_eq!(association.stylesheet.as_deref(), Some("h2{}"));

        let slots = source(&output, "App.Components.Toast.Slots.g.cs");
        assert!(slots.contains("public static string TitleSlotName => \"title\";"));
        assert!(slots.contains("builder.OpenElement(0, \"h2\");"));
        assert!(slots.contains(
            "public global::Microsoft.AspNetCore.Components.RenderFragment<global::Microsoft.AspNetCore.Components.RenderFragment?>? BodyTemplate { get; set; }"
        ));
        assert!(slots.contains("builder.OpenElement(3, \"div\");"));
        assert!(slots.contains("builder.AddContent(5, this.BodyTemplate, this.Body);"));
    }

    #[test]
    fn test_windows_checksum_path_finds_stylesheet() {
        let generated = SyntaxUnit::new(
            "C:\\src\\obj\\Widget.razor.g.cs",
            "#pragma checksum \"C:\\src\\Widget.razor\" \"{x}\" \"y\"\nnamespace Lib { public partial class Widget : Ostomachion.Blazor.WebComponents.WebComponentBase { } }",
        );
        let output = run(
            &[generated],
            &[
                AdditionalText::new("C:\\src\\Other.razor.css", "other"),
                AdditionalText::new("C:\\src\\Widget.razor.css", "mine"),
            ],
        );
        assert!(source(&output, "Lib.Widget.Stylesheet.g.cs").contains("Stylesheet => \"mine\";"));
    }

    #[test]
    fn test_unmarked_and_unrelated_classes_produce_nothing() {
        let output = run(
            &[unit(
                "Plain.cs",
                "namespace App;\npublic class Plain : ComponentBase { [Slot] public string X { get; set; } }\nclass Lookalike : WebComponentBaseish { }",
            )],
            &[AdditionalText::new("Plain.cs.css", "p{}")],
        );
        assert!(output.sources.is_empty());
        assert!(output.report.declarations.is_empty());
    }

    #[test]
    fn test_generic_component_with_templated_slot() {
        let output = run(
            &[unit(
                "Grid.cs",
                "namespace App;\npublic partial class Grid<TItem> : WebComponentBase where TItem : class\n{\n    [Slot(IsTemplated = true)] public TItem Row { get; set; } = default!;\n}\n",
            )],
            &[],
        );
        let slots = source(&output, "App.Grid.Slots.g.cs");
        assert!(slots.contains("partial class Grid<TItem>\n{"));
        assert!(slots.contains("RenderFragment<TItem>? RowTemplate { get; set; }"));
    }

    #[test]
    fn test_nested_declarations_reopen_their_containing_types() {
        let output = run(
            &[unit(
                "Outer.cs",
                "namespace App;\npublic partial class Outer<T>\n{\n    public partial class Inner : WebComponentBase { [Slot] public T Value { get; set; } = default!; }\n}\npublic partial record Host(int Id)\n{\n    public partial class Item : CustomElementBase { }\n}\n",
            )],
            &[],
        );

        assert_eq!(
            hints(&output),
            vec![
                "App.Host.Item.CustomElement.g.cs",
                "App.Outer.Inner.CustomElement.g.cs",
                "App.Outer.Inner.Slots.g.cs"
            ]
        );
        let inner = source(&output, "App.Outer.Inner.CustomElement.g.cs");
        assert!(inner.contains("partial class Outer<T>\n{\n    partial class Inner : "));
        let slots = source(&output, "App.Outer.Inner.Slots.g.cs");
        assert!(slots.contains("partial class Outer<T>\n{\n    partial class Inner\n"));
        let item = source(&output, "App.Host.Item.CustomElement.g.cs");
        assert!(item.contains("partial record Host\n{\n    partial class Item : "));
    }

    #[test]
    fn test_conditional_branches_do_not_conflict() {
        let output = run(
            &[unit(
                "Toast.cs",
                "namespace App;\n#if NET8_0_OR_GREATER\n[CustomElement(Extends = \"x-new\")]\n#else\n[CustomElement(Extends = \"x-old\")]\n#endif\npublic partial class Toast : CustomElementBase { }\n",
            )],
            &[],
        );
        assert!(output.report.conflicts.is_empty());
        assert!(source(&output, "App.Toast.CustomElement.g.cs").contains("LocalName => \"x-new\";"));
    }

    #[test]
    fn test_custom_marker_names() {
        let options = GeneratorOptions {
            custom_element_base: "My.Runtime.ElementBase".to_string(),
            ..GeneratorOptions::default()
        };
        let output = generate(
            &[SyntaxUnit::new("A.cs", "using My.Runtime;\nclass Button : ElementBase { }")],
            &[],
            options,
        )
        .unwrap();
        assert_eq!(hints(&output), vec!["Button.CustomElement.g.cs"]);
        assert_eq!(output.sources[0].kind, EmitterKind::Common);
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // INCREMENTAL PASSES & CANCELLATION
    // ═══════════════════════════════════════════════════════════════════════════════

    fn project(card_local_name: &str) -> Vec<SyntaxUnit> {
        vec![
            unit(
                "Toast.cs",
                "namespace App;\npublic partial class Toast : WebComponentBase { [Slot] public string Message { get; set; } }",
            ),
            unit(
                "Card.cs",
                &format!(
                    "namespace App;\n[CustomElement(Extends = \"{}\")]\npublic class Card : CustomElementBase {{ }}",
                    card_local_name
                ),
            ),
        ]
    }

    #[test]
    fn test_unchanged_declarations_are_reused() {
        let texts = [AdditionalText::new("Toast.cs.css", "p{}")];
        let mut generator = Generator::new(GeneratorOptions::default()).unwrap();
        let token = CancellationToken::new();

        let first = generator.run(&project("div"), &texts, &token).unwrap();
        assert_eq!(first.report.regenerated.len(), 4);
        assert!(first.report.reused.is_empty());

        let second = generator.run(&project("div"), &texts, &token).unwrap();
        assert!(second.report.regenerated.is_empty());
        assert_eq!(second.report.reused.len(), 4);
        assert_eq!(first.sources, second.sources);

        let third = generator.run(&project("button"), &texts, &token).unwrap();
        assert_eq!(third.report.regenerated, vec!["App.Card.CustomElement.g.cs"]);
        assert_eq!(third.report.reused.len(), 3);
        assert!(source(&third, "App.Card.CustomElement.g.cs").contains("LocalName => \"button\";"));
    }

    #[test]
    fn test_removed_declarations_disappear() {
        let mut generator = Generator::new(GeneratorOptions::default()).unwrap();
        let token = CancellationToken::new();
        generator.run(&project("div"), &[], &token).unwrap();

        let units = project("div");
        let output = generator.run(&units[1..], &[], &token).unwrap();
        assert_eq!(hints(&output), vec!["App.Card.CustomElement.g.cs"]);
        assert_eq!(output.report.reused, vec!["App.Card.CustomElement.g.cs"]);
    }

    #[test]
    fn test_cancelled_pass_has_no_effect() {
        let mut generator = Generator::new(GeneratorOptions::default()).unwrap();
        let cancelled = CancellationToken::new();
        cancelled.cancel();
        assert!(cancelled.is_cancelled());

        let err = generator.run(&project("div"), &[], &cancelled).unwrap_err();
        assert!(matches!(err, GeneratorError::Cancelled));

        let output = generator.run(&project("div"), &[], &CancellationToken::new()).unwrap();
        assert!(output.report.reused.is_empty());
        assert_eq!(output.report.regenerated.len(), 3);
    }

    #[test]
    fn test_cancellation_at_any_check_leaves_cache_untouched() {
        let mut completed = false;
        for checks in 0..200 {
            let mut generator = Generator::new(GeneratorOptions::default()).unwrap();
            generator.run(&project("div"), &[], &CancellationToken::new()).unwrap();

            match generator.run(&project("button"), &[], &CancellationToken::cancel_after(checks)) {
                Err(GeneratorError::Cancelled) => {
                    // Everything from the completed pass is still cached.
                    let again = generator.run(&project("div"), &[], &CancellationToken::new()).unwrap();
                    assert!(again.report.regenerated.is_empty(), "cancelled after {} checks", checks);
                    assert_eq!(again.report.reused.len(), 3);
                }
                Ok(output) => {
                    assert!(checks > 0);
                    assert_eq!(output.report.regenerated, vec!["App.Card.CustomElement.g.cs"]);
                    completed = true;
                    break;
                }
                Err(other) => panic!("unexpected error: {}", other),
            }
        }
        assert!(completed);
    }

    #[test]
    fn test_invalid_options_are_rejected() {
        let options = GeneratorOptions {
            front_end_extension: String::new(),
            ..GeneratorOptions::default()
        };
        assert!(matches!(
            Generator::new(options),
            Err(GeneratorError::InvalidOptions { .. })
        ));
    }

    // ═══════════════════════════════════════════════════════════════════════════════
    // PROPERTIES
    // ═══════════════════════════════════════════════════════════════════════════════

    fn component_units() -> Vec<SyntaxUnit> {
        (0..6)
            .map(|i| {
                let body = if i % 2 == 0 {
                    format!(
                        "namespace App.Part{i};\npublic partial class Widget{i} : WebComponentBase {{ [Slot(\"s{i}\")] public string Value {{ get; set; }} }}"
                    )
                } else {
                    format!("namespace App;\n[CustomElement(Extends = \"x-{i}\")] public class Element{i} : CustomElementBase {{ }}")
                };
                unit(&format!("Unit{}.cs", i), &body)
            })
            .collect()
    }

    fn component_texts() -> Vec<AdditionalText> {
        vec![
            AdditionalText::new("Unit0.cs.css", "a{}"),
            AdditionalText::new("Unit4.cs.css", "b{}"),
        ]
    }

    proptest! {
        #[test]
        fn output_is_independent_of_unit_order(units in Just(component_units()).prop_shuffle()) {
            let baseline = run(&component_units(), &component_texts());
            let shuffled = run(&units, &component_texts());
            prop_assert_eq!(&baseline.sources, &shuffled.sources);
            prop_assert_eq!(baseline.sources.len(), 11);
        }

        #[test]
        fn unnamed_slots_fall_back_to_property_name(name in "[A-Z][A-Za-z0-9]{0,12}") {
            let output = run(
                &[unit(
                    "W.cs",
                    &format!("public partial class W : WebComponentBase {{ [Slot] public string {} {{ get; set; }} }}", name),
                )],
                &[],
            );
            let slots = source(&output, "W.Slots.g.cs");
            let expected = format!("builder.AddAttribute(1, \"slot\", \"{}\");", name);
            prop_assert!(slots.contains(&expected));
        }

        #[test]
        fn repeated_runs_are_byte_identical(seed in 0usize..6) {
            let units: Vec<SyntaxUnit> = component_units().into_iter().cycle().skip(seed).take(6).collect();
            let first = run(&units, &component_texts());
            let second = run(&units, &component_texts());
            prop_assert_eq!(first, second);
        }
    }
}
