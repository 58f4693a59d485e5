/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The resolved-style record consumed by box construction.
//!
//! Style *resolution* happens outside this crate; what arrives here is the
//! small slice of computed values that tree shape depends on, plus the
//! pseudo tag identifying anonymous-box styles synthesized during
//! construction.

use servo_arc::Arc as ServoArc;

/// <https://drafts.csswg.org/css-display/#the-display-properties>
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Display {
    None,
    Contents,
    GeneratingBox(DisplayGeneratingBox),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DisplayGeneratingBox {
    OutsideInside {
        outside: DisplayOutside,
        inside: DisplayInside,
    },
    LayoutInternal(DisplayLayoutInternal),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DisplayOutside {
    Block,
    Inline,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DisplayInside {
    Flow,
    FlowRoot,
    Table,
}

/// <https://drafts.csswg.org/css-display-3/#layout-specific-display>
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DisplayLayoutInternal {
    TableCaption,
    TableCell,
    TableColumn,
    TableColumnGroup,
    TableFooterGroup,
    TableHeaderGroup,
    TableRow,
    TableRowGroup,
}

impl Display {
    pub fn block() -> Self {
        Display::GeneratingBox(DisplayGeneratingBox::OutsideInside {
            outside: DisplayOutside::Block,
            inside: DisplayInside::Flow,
        })
    }

    pub fn inline() -> Self {
        Display::GeneratingBox(DisplayGeneratingBox::OutsideInside {
            outside: DisplayOutside::Inline,
            inside: DisplayInside::Flow,
        })
    }

    pub fn inline_block() -> Self {
        Display::GeneratingBox(DisplayGeneratingBox::OutsideInside {
            outside: DisplayOutside::Inline,
            inside: DisplayInside::FlowRoot,
        })
    }

    pub fn table() -> Self {
        Display::GeneratingBox(DisplayGeneratingBox::OutsideInside {
            outside: DisplayOutside::Block,
            inside: DisplayInside::Table,
        })
    }

    pub fn inline_table() -> Self {
        Display::GeneratingBox(DisplayGeneratingBox::OutsideInside {
            outside: DisplayOutside::Inline,
            inside: DisplayInside::Table,
        })
    }

    pub fn internal(internal: DisplayLayoutInternal) -> Self {
        Display::GeneratingBox(DisplayGeneratingBox::LayoutInternal(internal))
    }

    pub fn outside(&self) -> Option<DisplayOutside> {
        match self {
            Display::GeneratingBox(generating) => Some(generating.outside()),
            Display::None | Display::Contents => None,
        }
    }
}

impl DisplayGeneratingBox {
    pub(crate) fn outside(&self) -> DisplayOutside {
        match self {
            DisplayGeneratingBox::OutsideInside { outside, .. } => *outside,
            // Layout-internal boxes sit in structural slots, not lines.
            DisplayGeneratingBox::LayoutInternal(_) => DisplayOutside::Block,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Position {
    #[default]
    Static,
    Relative,
    Absolute,
    Fixed,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Float {
    #[default]
    None,
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Overflow {
    #[default]
    Visible,
    Hidden,
    Scroll,
    Auto,
}

/// Which out-of-flow list a box belongs to, if any.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OutOfFlowKind {
    Float,
    Absolute,
    Fixed,
    Popup,
}

/// Identifies pseudo-element styles and the styles of anonymous boxes
/// synthesized during construction. `None` on the style of ordinary
/// element-backed boxes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PseudoElement {
    Before,
    After,
    FirstLetter,
    FirstLine,
    AnonymousBlock,
    AnonymousPositionedBlock,
    AnonymousTable,
    AnonymousTableRowGroup,
    AnonymousTableColGroup,
    AnonymousTableRow,
    AnonymousTableCell,
    ScrolledContent,
    FieldsetContent,
}

impl PseudoElement {
    /// True for styles that belong to constructor-synthesized boxes, as
    /// opposed to author-addressable pseudo-elements.
    pub fn is_anonymous_box(&self) -> bool {
        !matches!(
            self,
            PseudoElement::Before |
                PseudoElement::After |
                PseudoElement::FirstLetter |
                PseudoElement::FirstLine
        )
    }
}

/// The `content` property, reduced to what generated boxes need.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum Content {
    #[default]
    Normal,
    None,
    Items(Vec<ContentItem>),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ContentItem {
    Text(String),
    Attr(html5ever::LocalName),
    OpenQuote,
    CloseQuote,
    NoOpenQuote,
    NoCloseQuote,
}

/// `quotes` pairs, outermost first.
pub type QuotePairs = Vec<(Box<str>, Box<str>)>;

#[derive(Clone, Debug, PartialEq)]
pub struct ComputedStyle {
    pub display: Display,
    pub position: Position,
    pub float: Float,
    pub overflow: Overflow,
    /// Popup content is routed to the document's popup list regardless of
    /// `position`/`float`.
    pub popup: bool,
    pub pseudo: Option<PseudoElement>,
    /// True under `white-space: pre`-alike values; suppresses whitespace
    /// collapsing and whitespace-only drop decisions.
    pub preserve_whitespace: bool,
    pub quotes: QuotePairs,
    pub content: Content,
}

impl ComputedStyle {
    pub fn new(display: Display) -> Self {
        Self {
            display,
            position: Position::default(),
            float: Float::default(),
            overflow: Overflow::default(),
            popup: false,
            pseudo: None,
            preserve_whitespace: false,
            quotes: initial_quotes(),
            content: Content::Normal,
        }
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    pub fn with_float(mut self, float: Float) -> Self {
        self.float = float;
        self
    }

    pub fn with_overflow(mut self, overflow: Overflow) -> Self {
        self.overflow = overflow;
        self
    }

    pub fn with_popup(mut self) -> Self {
        self.popup = true;
        self
    }

    pub fn with_pseudo(mut self, pseudo: PseudoElement) -> Self {
        self.pseudo = Some(pseudo);
        self
    }

    pub fn with_content(mut self, content: Content) -> Self {
        self.content = content;
        self
    }

    pub fn with_preserved_whitespace(mut self) -> Self {
        self.preserve_whitespace = true;
        self
    }

    pub fn with_quotes(mut self, quotes: QuotePairs) -> Self {
        self.quotes = quotes;
        self
    }

    /// Synthesizes the style of an anonymous box from the style it
    /// inherits from. Display follows the pseudo tag; inherited values
    /// (quotes, whitespace handling) carry over, everything else resets.
    pub fn anonymous(parent: &ComputedStyle, pseudo: PseudoElement) -> ServoArc<ComputedStyle> {
        debug_assert!(pseudo.is_anonymous_box());
        let display = match pseudo {
            // An anonymous table generated inside an inline formatting
            // context participates in it as an inline-table.
            PseudoElement::AnonymousTable if parent.is_inline_flow() => Display::inline_table(),
            PseudoElement::AnonymousTable => Display::table(),
            PseudoElement::AnonymousTableRowGroup => {
                Display::internal(DisplayLayoutInternal::TableRowGroup)
            },
            PseudoElement::AnonymousTableColGroup => {
                Display::internal(DisplayLayoutInternal::TableColumnGroup)
            },
            PseudoElement::AnonymousTableRow => Display::internal(DisplayLayoutInternal::TableRow),
            PseudoElement::AnonymousTableCell => Display::internal(DisplayLayoutInternal::TableCell),
            _ => Display::block(),
        };
        // The positioned variant keeps absolute descendants of a split
        // inline positioned against the split, not some farther ancestor.
        let position = match pseudo {
            PseudoElement::AnonymousPositionedBlock => Position::Relative,
            _ => Position::Static,
        };
        ServoArc::new(Self {
            display,
            position,
            float: Float::None,
            overflow: Overflow::Visible,
            popup: false,
            pseudo: Some(pseudo),
            preserve_whitespace: parent.preserve_whitespace,
            quotes: parent.quotes.clone(),
            content: Content::Normal,
        })
    }

    pub fn is_anonymous(&self) -> bool {
        self.pseudo.is_some_and(|pseudo| pseudo.is_anonymous_box())
    }

    /// The list a box with this style leaves the normal flow for, if any.
    /// `position` beats `float`, popups beat both.
    pub fn out_of_flow_kind(&self) -> Option<OutOfFlowKind> {
        if self.popup {
            return Some(OutOfFlowKind::Popup);
        }
        match self.position {
            Position::Absolute => return Some(OutOfFlowKind::Absolute),
            Position::Fixed => return Some(OutOfFlowKind::Fixed),
            Position::Static | Position::Relative => {},
        }
        if self.float != Float::None {
            return Some(OutOfFlowKind::Float);
        }
        None
    }

    pub fn is_out_of_flow(&self) -> bool {
        self.out_of_flow_kind().is_some()
    }

    pub fn is_absolutely_positioned(&self) -> bool {
        matches!(self.position, Position::Absolute | Position::Fixed)
    }

    pub fn is_floated(&self) -> bool {
        self.out_of_flow_kind() == Some(OutOfFlowKind::Float)
    }

    /// Positioned boxes are the containing blocks of their
    /// absolutely-positioned descendants.
    pub fn establishes_containing_block_for_absolutes(&self) -> bool {
        self.position != Position::Static
    }

    pub fn establishes_scroll_container(&self) -> bool {
        self.overflow != Overflow::Visible
    }

    /// Block-level for flow purposes. Out-of-flow boxes always are, no
    /// matter what `display` computed to.
    pub fn is_block_level(&self) -> bool {
        if self.is_out_of_flow() {
            return true;
        }
        matches!(self.display.outside(), Some(DisplayOutside::Block))
    }

    pub fn is_inline_level(&self) -> bool {
        !self.is_out_of_flow() && matches!(self.display.outside(), Some(DisplayOutside::Inline))
    }

    /// An inline box in the flow sense: inline outside, flow inside, still
    /// in flow. Atomic inlines (inline-block, inline-table) are line
    /// participants but never split.
    pub fn is_inline_flow(&self) -> bool {
        !self.is_out_of_flow() &&
            matches!(
                self.display,
                Display::GeneratingBox(DisplayGeneratingBox::OutsideInside {
                    outside: DisplayOutside::Inline,
                    inside: DisplayInside::Flow,
                })
            )
    }
}

/// Initial value of `quotes` per CSS: language-appropriate quote marks.
/// The depth-keyed lookup lives in `crate::quotes`.
pub fn initial_quotes() -> QuotePairs {
    vec![
        ("\u{201c}".into(), "\u{201d}".into()),
        ("\u{2018}".into(), "\u{2019}".into()),
    ]
}
