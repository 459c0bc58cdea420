//! Semantic roles
//!
//! ARIA roles as exposed to the screen reader, either explicit (`role`
//! attribute) or implied by the element's tag.

use std::fmt;

use crate::ElementData;

/// Semantic role of an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    // Landmark roles
    Banner,
    Complementary,
    ContentInfo,
    Form,
    Main,
    Navigation,
    Region,
    Search,

    // Widget roles
    Alert,
    AlertDialog,
    Button,
    Checkbox,
    ComboBox,
    Dialog,
    Link,
    ListBox,
    Menu,
    MenuBar,
    MenuItem,
    Option,
    ProgressBar,
    Radio,
    RadioGroup,
    SearchBox,
    Slider,
    SpinButton,
    Status,
    Switch,
    Tab,
    TabList,
    TabPanel,
    TextBox,
    ToolTip,
    Tree,
    TreeItem,

    // Document structure
    Article,
    Cell,
    ColumnHeader,
    Document,
    Figure,
    Group,
    Heading,
    Img,
    List,
    ListItem,
    Paragraph,
    Presentation,
    Row,
    RowHeader,
    Separator,
    Table,
}

impl Role {
    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s.to_ascii_lowercase().as_str() {
            "banner" => Self::Banner,
            "complementary" => Self::Complementary,
            "contentinfo" => Self::ContentInfo,
            "form" => Self::Form,
            "main" => Self::Main,
            "navigation" => Self::Navigation,
            "region" => Self::Region,
            "search" => Self::Search,
            "alert" => Self::Alert,
            "alertdialog" => Self::AlertDialog,
            "button" => Self::Button,
            "checkbox" => Self::Checkbox,
            "combobox" => Self::ComboBox,
            "dialog" => Self::Dialog,
            "link" => Self::Link,
            "listbox" => Self::ListBox,
            "menu" => Self::Menu,
            "menubar" => Self::MenuBar,
            "menuitem" => Self::MenuItem,
            "option" => Self::Option,
            "progressbar" => Self::ProgressBar,
            "radio" => Self::Radio,
            "radiogroup" => Self::RadioGroup,
            "searchbox" => Self::SearchBox,
            "slider" => Self::Slider,
            "spinbutton" => Self::SpinButton,
            "status" => Self::Status,
            "switch" => Self::Switch,
            "tab" => Self::Tab,
            "tablist" => Self::TabList,
            "tabpanel" => Self::TabPanel,
            "textbox" => Self::TextBox,
            "tooltip" => Self::ToolTip,
            "tree" => Self::Tree,
            "treeitem" => Self::TreeItem,
            "article" => Self::Article,
            "cell" => Self::Cell,
            "columnheader" => Self::ColumnHeader,
            "document" => Self::Document,
            "figure" => Self::Figure,
            "group" => Self::Group,
            "heading" => Self::Heading,
            "img" | "image" => Self::Img,
            "list" => Self::List,
            "listitem" => Self::ListItem,
            "paragraph" => Self::Paragraph,
            "none" | "presentation" => Self::Presentation,
            "row" => Self::Row,
            "rowheader" => Self::RowHeader,
            "separator" => Self::Separator,
            "table" => Self::Table,
            _ => return None,
        })
    }

    /// Canonical lower-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Banner => "banner",
            Self::Complementary => "complementary",
            Self::ContentInfo => "contentinfo",
            Self::Form => "form",
            Self::Main => "main",
            Self::Navigation => "navigation",
            Self::Region => "region",
            Self::Search => "search",
            Self::Alert => "alert",
            Self::AlertDialog => "alertdialog",
            Self::Button => "button",
            Self::Checkbox => "checkbox",
            Self::ComboBox => "combobox",
            Self::Dialog => "dialog",
            Self::Link => "link",
            Self::ListBox => "listbox",
            Self::Menu => "menu",
            Self::MenuBar => "menubar",
            Self::MenuItem => "menuitem",
            Self::Option => "option",
            Self::ProgressBar => "progressbar",
            Self::Radio => "radio",
            Self::RadioGroup => "radiogroup",
            Self::SearchBox => "searchbox",
            Self::Slider => "slider",
            Self::SpinButton => "spinbutton",
            Self::Status => "status",
            Self::Switch => "switch",
            Self::Tab => "tab",
            Self::TabList => "tablist",
            Self::TabPanel => "tabpanel",
            Self::TextBox => "textbox",
            Self::ToolTip => "tooltip",
            Self::Tree => "tree",
            Self::TreeItem => "treeitem",
            Self::Article => "article",
            Self::Cell => "cell",
            Self::ColumnHeader => "columnheader",
            Self::Document => "document",
            Self::Figure => "figure",
            Self::Group => "group",
            Self::Heading => "heading",
            Self::Img => "img",
            Self::List => "list",
            Self::ListItem => "listitem",
            Self::Paragraph => "paragraph",
            Self::Presentation => "presentation",
            Self::Row => "row",
            Self::RowHeader => "rowheader",
            Self::Separator => "separator",
            Self::Table => "table",
        }
    }

    /// Role implied by the tag (and, for inputs, the `type` attribute)
    pub fn implicit(elem: &ElementData) -> Option<Self> {
        Some(match elem.tag.as_str() {
            "a" | "area" if elem.get_attr("href").is_some() => Self::Link,
            "article" => Self::Article,
            "aside" => Self::Complementary,
            "button" => Self::Button,
            "footer" => Self::ContentInfo,
            "form" => Self::Form,
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => Self::Heading,
            "header" => Self::Banner,
            "hr" => Self::Separator,
            "img" => Self::Img,
            "input" => return Self::implicit_input(elem),
            "li" => Self::ListItem,
            "main" => Self::Main,
            "nav" => Self::Navigation,
            "ol" | "ul" => Self::List,
            "option" => Self::Option,
            "p" => Self::Paragraph,
            "progress" => Self::ProgressBar,
            "search" => Self::Search,
            "section" => Self::Region,
            "select" => Self::ComboBox,
            "table" => Self::Table,
            "td" => Self::Cell,
            "textarea" => Self::TextBox,
            "th" => Self::ColumnHeader,
            "tr" => Self::Row,
            "dialog" => Self::Dialog,
            "figure" => Self::Figure,
            _ => return None,
        })
    }

    fn implicit_input(elem: &ElementData) -> Option<Self> {
        let kind = elem.get_attr("type").unwrap_or("text").to_ascii_lowercase();
        Some(match kind.as_str() {
            "button" | "submit" | "reset" | "image" => Self::Button,
            "checkbox" => Self::Checkbox,
            "radio" => Self::Radio,
            "range" => Self::Slider,
            "number" => Self::SpinButton,
            "search" => Self::SearchBox,
            "hidden" | "file" | "color" => return None,
            _ => Self::TextBox,
        })
    }

    /// Check if role accepts typed input
    pub fn is_edit_field(self) -> bool {
        matches!(self, Self::TextBox | Self::SearchBox | Self::ComboBox | Self::SpinButton)
    }

    /// Check if role is landmark
    pub fn is_landmark(&self) -> bool {
        matches!(
            self,
            Self::Banner
                | Self::Complementary
                | Self::ContentInfo
                | Self::Form
                | Self::Main
                | Self::Navigation
                | Self::Region
                | Self::Search
        )
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
