//! Inline stylesheet for the report, one rule per class the document emits.

pub const STYLESHEET: &str = "\
.sonarcheck{font-family: arial, helvetica, clean, sans-serif; font-size: 15px;}
.sonarcheck-header{background-color: #ECECEC; border: 1px solid #DDD; padding: 4px; margin-bottom: 20px;}
.sonarcheck-header-warning{color: #E91313}
.sonarcheck-header-issues{}
.sonarcheck-issue{border: 1px solid #DDD; margin-top: 10px;}
.sonarcheck-issue-summary{background-color: #E4ECF3; padding: 4px;}
.sonarcheck-issue-summary-sep{border-left: 2px solid #61c940; height: 13px; display: inline-block; margin-left: 5px; margin-right: 5px;}
.sonarcheck-issue-summary-message{}
.sonarcheck-issue-summary-type{color: #777;}
.sonarcheck-issue-summary-severity{color: #777;}
.sonarcheck-issue-summary-file{color: #777;}
.sonarcheck-issue-summary-more{cursor: pointer; font-size: 10px;}
.sonarcheck-issue-summary-less{cursor: pointer; font-size: 10px;}
.sonarcheck-issue-infos{padding: 4px; background-color: #F0E5E4; font-family: sans-serif; font-size: 13px; border: 0px solid #DDD; border-top-width: 1px;}
.sonarcheck-issue-infos-content{}
.sonarcheck-issue-infos-content-key{font-weight: bold;}
.sonarcheck-issue-infos-content-value{}
.sonarcheck-issue-preview{background-color: #F4F4F4; font-family: monospace; border-collapse: collapse; border: 0px solid #DDD; border-top-width: 1px; width:100%;}
.sonarcheck-issue-line-preview{}
.sonarcheck-issue-line-preview-number{padding-left: 5px; padding-right: 5px; width:0px; font-weight: bold;}
.sonarcheck-issue-line-preview-content{padding: 2px;}
.sonarcheck-issue-line-preview-content-none{}
.sonarcheck-issue-line-preview-content-code{background-color: #F6AFAF;}
";
