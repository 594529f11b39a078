//! Slot-backed members and the slot rendering routine of a web component.

use super::{global, identifier, open_declaration, string_literal, EmitRecord, SourceWriter};
use crate::model::SlotFragment;
use crate::options::GeneratorOptions;

const TEMPLATED_ROOT_ELEMENT: &str = "div";
const TEXT_ROOT_ELEMENT: &str = "span";

/// Render-tree sequence numbers; strictly increasing within one routine.
struct Sequence(u32);

impl Sequence {
    fn next(&mut self) -> u32 {
        let current = self.0;
        self.0 += 1;
        current
    }
}

/// Wrapper element tag: the explicit override, else `div` for templated or
/// fragment-typed slots and `span` for everything else.
pub fn root_element(slot: &SlotFragment) -> &str {
    match &slot.root_element {
        Some(tag) => tag,
        None if slot.is_templated || slot.is_render_fragment => TEMPLATED_ROOT_ELEMENT,
        None => TEXT_ROOT_ELEMENT,
    }
}

pub fn emit(record: &EmitRecord<'_>, options: &GeneratorOptions) -> String {
    let mut writer = SourceWriter::new();
    open_declaration(&mut writer, record, None);

    for slot in record.slots {
        if slot.is_templated {
            writer.line(&format!("[{}]", global(&options.parameter_attribute)));
            writer.line(&format!(
                "public {}<{}>? {}Template {{ get; set; }}",
                global(&options.render_fragment_type),
                slot.value_type,
                slot.property_name
            ));
        } else {
            writer.line(&format!(
                "public static string {}SlotName => {};",
                slot.property_name,
                string_literal(&slot.slot_name)
            ));
        }
        writer.blank();
    }

    writer.open(&format!(
        "protected override void BuildRenderTreeSlots({} builder)",
        global(&options.render_tree_builder_type)
    ));
    let mut sequence = Sequence(0);
    for slot in record.slots {
        write_slot(&mut writer, slot, &mut sequence);
    }
    writer.close();

    writer.finish()
}

fn write_slot(writer: &mut SourceWriter, slot: &SlotFragment, sequence: &mut Sequence) {
    writer.line(&format!(
        "builder.OpenElement({}, {});",
        sequence.next(),
        string_literal(root_element(slot))
    ));
    writer.line(&format!(
        "builder.AddAttribute({}, \"slot\", {});",
        sequence.next(),
        string_literal(&slot.slot_name)
    ));

    let value = format!("this.{}", identifier(&slot.property_name));
    match &slot.default_text {
        Some(default_text) => {
            // Boxed: value-typed slots cannot be compared with null directly.
            writer.open(&format!("if ((object?){} is null)", value));
            writer.line(&format!(
                "builder.AddContent({}, {});",
                sequence.next(),
                string_literal(default_text)
            ));
            writer.close();
            writer.open("else");
            write_content(writer, slot, &value, sequence);
            writer.close();
        }
        None => write_content(writer, slot, &value, sequence),
    }

    writer.line("builder.CloseElement();");
}

fn write_content(writer: &mut SourceWriter, slot: &SlotFragment, value: &str, sequence: &mut Sequence) {
    if slot.is_templated {
        writer.line(&format!(
            "builder.AddContent({}, this.{}Template, {});",
            sequence.next(),
            slot.property_name,
            value
        ));
    } else {
        writer.line(&format!("builder.AddContent({}, {});", sequence.next(), value));
    }
}
